// ==========================================
// 周记录生命周期测试
// ==========================================
// 职责: 验证 不存在 → 草稿 → 草稿 → 已提交 (锁定) 的完整流程
// ==========================================


#[cfg(test)]
mod record_lifecycle_test {
    use ponto_engine::api::ApiError;
    use ponto_engine::app::AppState;
    use ponto_engine::config::{config_keys, ConfigManager};
    use ponto_engine::domain::DayInput;
    use ponto_engine::{DayStatus, RecordStatus};

    use crate::test_helpers::{create_test_db, create_test_state, ids, RecordRequestBuilder};

    #[test]
    fn test_write_update_submit_lock_scenario() {
        ponto_engine::logging::init_test();
        let (_tmp, state) = create_test_state();
        let api = &state.ponto_api;

        assert!(api.get_record("W", 2026, 3).unwrap().is_none());

        let created = api
            .write_record(&RecordRequestBuilder::new("W", 2026, 3).production(2.0).build())
            .unwrap();
        assert_eq!(created.record.status, RecordStatus::Draft);

        let updated = api
            .write_record(
                &RecordRequestBuilder::new("W", 2026, 3)
                    .production(7.5)
                    .with_saturday(3.0)
                    .build(),
            )
            .unwrap();
        assert_eq!(updated.record.id, created.record.id);
        assert_eq!(updated.production_total(), 40.5);
        assert_eq!(api.list_records("W", 2026, &[]).unwrap().len(), 1);

        let submitted = api.submit_period(&ids(&["W"]), 2026, &[3]).unwrap();
        assert_eq!(submitted.newly_submitted, 1);
        let stored = api.get_record("W", 2026, 3).unwrap().unwrap();
        assert_eq!(stored.record.status, RecordStatus::Submitted);

        let err = api
            .write_record(&RecordRequestBuilder::new("W", 2026, 3).build())
            .unwrap_err();
        assert!(matches!(err, ApiError::RecordLocked { week_number: 3, .. }));

        // 锁定后数据不变
        let after = api.get_record("W", 2026, 3).unwrap().unwrap();
        assert_eq!(after, stored);
    }

    #[test]
    fn test_day_set_matches_saturday_flag_after_write() {
        let (_tmp, state) = create_test_state();
        let api = &state.ponto_api;

        let with_sat = api
            .write_record(&RecordRequestBuilder::new("W1", 2026, 10).with_saturday(1.0).build())
            .unwrap();
        assert_eq!(with_sat.day_set(), vec![1, 2, 3, 4, 5, 6]);

        let without_sat = api
            .write_record(&RecordRequestBuilder::new("W1", 2026, 10).build())
            .unwrap();
        assert_eq!(without_sat.day_set(), vec![1, 2, 3, 4, 5]);
        assert!(!without_sat.record.saturday_active);
    }

    #[test]
    fn test_invalid_writes_are_rejected_without_side_effects() {
        let (_tmp, state) = create_test_state();
        let api = &state.ponto_api;

        let mut req = RecordRequestBuilder::new("W1", 2026, 5).build();
        req.days[0].status = "Doente".to_string();
        assert!(matches!(api.write_record(&req), Err(ApiError::InvalidDayStatus(_))));

        let mut req = RecordRequestBuilder::new("W1", 2026, 5).build();
        req.saturday_active = true;
        assert!(matches!(api.write_record(&req), Err(ApiError::InvalidDayStatus(_))));

        let mut req = RecordRequestBuilder::new("W1", 2026, 5).build();
        req.days.push(DayInput::normal(6, 1.0));
        assert!(matches!(api.write_record(&req), Err(ApiError::InvalidDayStatus(_))));

        let mut req = RecordRequestBuilder::new("W1", 2026, 5).build();
        req.days[2].production = -3.0;
        assert!(matches!(api.write_record(&req), Err(ApiError::InvalidEntry(_))));

        let req = RecordRequestBuilder::new("W1", 2026, 53).build();
        assert!(matches!(api.write_record(&req), Err(ApiError::InvalidPeriod(_))));

        assert!(api.get_record("W1", 2026, 5).unwrap().is_none());
    }

    #[test]
    fn test_non_normal_days_count_as_unworked() {
        let (_tmp, state) = create_test_state();
        let saved = state
            .ponto_api
            .write_record(
                &RecordRequestBuilder::new("W1", 2026, 8)
                    .day_status(1, DayStatus::Vacation)
                    .day_status(2, DayStatus::UnjustifiedAbsence)
                    .day_status(3, DayStatus::BirthdayOff)
                    .build(),
            )
            .unwrap();
        assert_eq!(saved.worked_days_total(), 2);
        assert_eq!(saved.entries[0].status, DayStatus::Vacation);
        assert_eq!(saved.entries[0].worked_days, 0);
    }

    #[test]
    fn test_submit_refused_when_any_worker_missing() {
        let (_tmp, state) = create_test_state();
        let api = &state.ponto_api;
        api.write_record(&RecordRequestBuilder::new("W1", 2026, 3).build()).unwrap();
        api.write_record(&RecordRequestBuilder::new("W2", 2026, 3).build()).unwrap();

        let err = api
            .submit_period(&ids(&["W1", "W2", "W3"]), 2026, &[3])
            .unwrap_err();
        match err {
            ApiError::IncompleteCoverage { missing, .. } => assert_eq!(missing, vec!["W3"]),
            other => panic!("unexpected error: {other:?}"),
        }

        let status = api.get_period_status(&ids(&["W1", "W2", "W3"]), 2026, 3).unwrap();
        assert_eq!(status.existing, 2);
        assert_eq!(status.submitted, 0);
        assert!(!status.fully_recorded);
    }

    #[test]
    fn test_multi_period_submit_is_all_or_nothing() {
        let (_tmp, state) = create_test_state();
        let api = &state.ponto_api;
        api.write_record(&RecordRequestBuilder::new("W1", 2026, 3).build()).unwrap();
        api.write_record(&RecordRequestBuilder::new("W1", 2026, 4).build()).unwrap();

        assert!(matches!(
            api.submit_period(&ids(&["W1"]), 2026, &[3, 4, 5]),
            Err(ApiError::IncompleteCoverage { .. })
        ));
        assert_eq!(
            api.get_record("W1", 2026, 3).unwrap().unwrap().record.status,
            RecordStatus::Draft
        );

        let ok = api.submit_period(&ids(&["W1"]), 2026, &[4, 3]).unwrap();
        assert_eq!(ok.week_numbers, vec![3, 4]);
        assert_eq!(ok.newly_submitted, 2);
    }

    #[test]
    fn test_submit_twice_is_noop() {
        let (_tmp, state) = create_test_state();
        let api = &state.ponto_api;
        api.write_record(&RecordRequestBuilder::new("W1", 2026, 3).build()).unwrap();

        api.submit_period(&ids(&["W1"]), 2026, &[3]).unwrap();
        let before = api.get_record("W1", 2026, 3).unwrap().unwrap();

        let again = api.submit_period(&ids(&["W1"]), 2026, &[3]).unwrap();
        assert_eq!(again.newly_submitted, 0);
        assert_eq!(again.already_submitted, 1);
        assert_eq!(api.get_record("W1", 2026, 3).unwrap().unwrap(), before);
    }

    #[test]
    fn test_submit_input_validation() {
        let (_tmp, state) = create_test_state();
        let api = &state.ponto_api;
        assert!(matches!(
            api.submit_period(&[], 2026, &[3]),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            api.submit_period(&ids(&["W1"]), 2026, &[]),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(matches!(
            api.submit_period(&ids(&["W1"]), 2026, &[0]),
            Err(ApiError::InvalidPeriod(_))
        ));
    }

    #[test]
    fn test_delete_draft_only() {
        let (_tmp, state) = create_test_state();
        let api = &state.ponto_api;
        api.write_record(&RecordRequestBuilder::new("W1", 2026, 3).build()).unwrap();
        api.write_record(&RecordRequestBuilder::new("W1", 2026, 4).build()).unwrap();
        api.submit_period(&ids(&["W1"]), 2026, &[4]).unwrap();

        api.delete_record("W1", 2026, 3).unwrap();
        assert!(api.get_record("W1", 2026, 3).unwrap().is_none());
        assert!(matches!(api.delete_record("W1", 2026, 3), Err(ApiError::NotFound(_))));
        assert!(matches!(
            api.delete_record("W1", 2026, 4),
            Err(ApiError::RecordLocked { .. })
        ));
    }

    #[test]
    fn test_notes_truncated_to_configured_limit() {
        let (_tmp, db_path) = create_test_db().unwrap();
        {
            let cfg = ConfigManager::new(&db_path).unwrap();
            cfg.set_global_config_value(config_keys::NOTES_MAX_CHARS, "10").unwrap();
        }
        let state = AppState::new(db_path).unwrap();

        let saved = state
            .ponto_api
            .write_record(
                &RecordRequestBuilder::new("W1", 2026, 3)
                    .notes("Choveu o dia todo na quinta")
                    .build(),
            )
            .unwrap();
        assert_eq!(saved.record.notes.as_deref(), Some("Choveu o d"));

        let long = "é".repeat(900);
        let saved = state
            .ponto_api
            .write_record(&RecordRequestBuilder::new("W2", 2026, 3).notes(&long).build())
            .unwrap();
        assert_eq!(saved.record.notes.map(|n| n.chars().count()), Some(10));
    }

    #[test]
    fn test_period_queries() {
        let (_tmp, state) = create_test_state();
        let api = &state.ponto_api;

        let info = api
            .get_period(chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
            .unwrap();
        assert_eq!((info.year, info.period), (2025, 53));

        let range = api.get_period_range(2026, 3).unwrap();
        assert_eq!(range.label, "SE 03/2026");
        assert_eq!(range.start, chrono::NaiveDate::from_ymd_opt(2026, 1, 18).unwrap());
        assert_eq!(range.end, chrono::NaiveDate::from_ymd_opt(2026, 1, 24).unwrap());

        assert!(matches!(api.get_period_range(2026, 53), Err(ApiError::InvalidPeriod(_))));

        let current = api.get_current_period().unwrap();
        assert!(current.start <= current.end);
    }
}
