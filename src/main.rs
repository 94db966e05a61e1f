// ==========================================
// 周考勤登记引擎 - 命令行入口
// ==========================================
// 用法:
//   ponto-engine period <YYYY-MM-DD>
//   ponto-engine range <year> <period>
//   ponto-engine rollup [--db <db_path>] <year> <period[,period...]> [role] [scope_id] [all|pending|complete]
//   未指定 --db 时使用默认库 (PONTO_DB_PATH 或用户数据目录)
// 输出: JSON (stdout)，日志走 stderr
// ==========================================

use chrono::NaiveDate;
use ponto_engine::api::PeriodInfo;
use ponto_engine::app::{get_default_db_path, AppState};
use ponto_engine::engine::{EpidemiologicalCalendar, RollupFilter};
use ponto_engine::Role;
use std::error::Error;

const USAGE: &str = "用法:
  ponto-engine period <YYYY-MM-DD>
  ponto-engine range <year> <period>
  ponto-engine rollup [--db <db_path>] <year> <period[,period...]> [role] [scope_id] [all|pending|complete]";

fn main() -> Result<(), Box<dyn Error>> {
    ponto_engine::logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("");

    match command {
        "period" => {
            let raw = args.get(1).ok_or(USAGE)?;
            let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")?;
            let calendar = EpidemiologicalCalendar::new();
            let period = calendar.period_of(date)?;
            let range = calendar.range_of(period.year, period.number)?;
            let info = PeriodInfo::new(period, range);
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        "range" => {
            let year: i32 = args.get(1).ok_or(USAGE)?.trim().parse()?;
            let period: u32 = args.get(2).ok_or(USAGE)?.trim().parse()?;
            let calendar = EpidemiologicalCalendar::new();
            let validated = calendar.validate(year, period)?;
            let info = PeriodInfo::new(validated, calendar.range_of(year, period)?);
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        "rollup" => {
            let (db_path, rest) = match args.get(1).map(String::as_str) {
                Some("--db") => (args.get(2).ok_or(USAGE)?.clone(), &args[3..]),
                _ => (get_default_db_path(), &args[1..]),
            };
            let year: i32 = rest.first().ok_or(USAGE)?.trim().parse()?;
            let periods = parse_periods(rest.get(1).ok_or(USAGE)?)?;
            let role = match rest.get(2) {
                Some(r) => Role::from_db_str(r).ok_or_else(|| format!("未知角色: {}", r))?,
                None => Role::SuperAdmin,
            };
            let scope_id = rest.get(3).map(String::as_str).unwrap_or("");
            let filter = match rest.get(4) {
                Some(f) => RollupFilter::parse(f).ok_or_else(|| format!("未知过滤条件: {}", f))?,
                None => RollupFilter::All,
            };

            let state = AppState::new(db_path)?;
            let report = state
                .monitoring_api
                .get_rollup(role, scope_id, year, &periods, filter)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}

fn parse_periods(raw: &str) -> Result<Vec<u32>, Box<dyn Error>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .map_err(|e| -> Box<dyn Error> { format!("周序号无效 '{}': {}", s, e).into() })
        })
        .collect()
}
