// ==========================================
// 周考勤登记引擎 - 日志初始化
// ==========================================
// 输出: stderr；stdout 只承载 CLI 的 JSON 结果，
//       这样 `ponto-engine rollup ... > report.json` 不会混入日志
// 级别: RUST_LOG (EnvFilter)，默认 info
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// 初始化进程日志 (CLI 入口调用一次)
///
/// 写入/提交/冲突重试在 info/warn 级别记录；
/// 需要查看层级构建与名册裁剪细节时使用
/// `RUST_LOG=ponto_engine=debug`
///
/// ```no_run
/// ponto_engine::logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .init();
}

/// 测试用日志: debug 级别，经 test writer 输出，重复调用无副作用
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
