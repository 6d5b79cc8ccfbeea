// ==========================================
// JSON 场景集成测试
// ==========================================
// 测试目标: 外部 JSON 快照 (目录/排班/配置) 可直接驱动排程
// 覆盖范围: camelCase 反序列化、配置文件加载与覆写、结果序列化
// ==========================================

use infusion_aps::config::config_keys;
use infusion_aps::domain::Medication;
use infusion_aps::engine::{DayContextInput, WeekDistributor, WorkloadReporter};
use infusion_aps::{DepartmentConfig, MedicationCatalog, TreatmentRequest};
use std::collections::HashMap;
use std::io::Write;

const CATALOG_JSON: &str = r#"[
  {
    "id": "RITUX",
    "name": "Rituximab",
    "category": "biologic",
    "checkInterval": 60,
    "variants": [
      { "occurrence": 1, "timing": { "infusionMinutes": 175 } },
      { "occurrence": 2, "timing": { "infusionMinutes": 90, "nurseSetupMinutes": 10 } }
    ]
  },
  {
    "id": "PROTO",
    "priority": "LOW",
    "variants": [
      {
        "occurrence": 1,
        "actions": [
          { "name": "Setup", "type": "setup", "duration": 15, "offset": 0, "isNurseAction": true },
          { "name": "Double check", "type": "protocol_check", "duration": 5, "offset": 15, "isNurseAction": true },
          { "name": "Infusion", "type": "infusion", "duration": 45, "offset": 15 },
          { "name": "Removal", "type": "removal", "duration": 5, "offset": 60, "isNurseAction": true }
        ]
      }
    ]
  }
]"#;

const DAYS_JSON: &str = r#"[
  {
    "roster": {
      "date": "2026-03-02",
      "staff": [
        { "name": "Ana", "maxPatients": 6 },
        { "name": "Ben", "maxPatients": 4, "maxWorkTime": 360 }
      ],
      "coordinator": { "name": "Lead", "maxPatients": 5 }
    },
    "capacityCeiling": 3
  },
  {
    "roster": {
      "date": "2026-03-03",
      "staff": [ { "name": "Ana", "maxPatients": 6 } ]
    }
  }
]"#;

fn catalog() -> MedicationCatalog {
    let medications: Vec<Medication> = serde_json::from_str(CATALOG_JSON).unwrap();
    MedicationCatalog::new(medications)
}

#[test]
fn test_distribute_from_json_snapshot() {
    let catalog = catalog();
    let config = DepartmentConfig::default();
    let days: Vec<DayContextInput> = serde_json::from_str(DAYS_JSON).unwrap();
    let requests: Vec<TreatmentRequest> = serde_json::from_str(
        r#"[{ "medicationId": "RITUX", "occurrence": 1, "quantity": 3 },
            { "medicationId": "PROTO", "occurrence": 1 }]"#,
    )
    .unwrap();
    assert_eq!(requests[1].quantity, 1);

    let result = WeekDistributor::new(&catalog, &config)
        .distribute(&requests, &days)
        .unwrap();
    assert_eq!(result.placed.len() + result.skipped.len(), 4);
    assert!(result.days[0].placed_count <= 3);

    let json = serde_json::to_value(&result).unwrap();
    assert!(json["placed"][0]["medicationId"].is_string());
    assert!(json["placed"][0]["actions"][0]["type"].is_string());
    assert!(json["days"][0]["staffStats"].is_array());
}

#[test]
fn test_protocol_check_dropped_on_planning_path() {
    let catalog = catalog();
    let config = DepartmentConfig::default();
    let days: Vec<DayContextInput> = serde_json::from_str(DAYS_JSON).unwrap();

    let result = WeekDistributor::new(&catalog, &config)
        .distribute(&[TreatmentRequest { medication_id: "PROTO".into(), occurrence: 1, quantity: 1 }], &days)
        .unwrap();
    let placed = &result.placed[0];
    assert!(placed.actions.iter().all(|a| a.action_type.as_str() != "protocol_check"));
}

#[test]
fn test_protocol_check_kept_uses_second_nurse() {
    let catalog = catalog();
    let config = DepartmentConfig {
        keep_protocol_check: true,
        ..Default::default()
    };
    let days: Vec<DayContextInput> = serde_json::from_str(DAYS_JSON).unwrap();

    let result = WeekDistributor::new(&catalog, &config)
        .distribute(&[TreatmentRequest { medication_id: "PROTO".into(), occurrence: 1, quantity: 1 }], &days)
        .unwrap();
    let placed = &result.placed[0];
    let setup = placed.actions.iter().find(|a| a.action_type.as_str() == "setup").unwrap();
    let check = placed
        .actions
        .iter()
        .find(|a| a.action_type.as_str() == "protocol_check")
        .unwrap();
    assert!(check.staff_id.is_some());
    assert_ne!(setup.staff_id, check.staff_id);
}

#[test]
fn test_config_file_with_overrides() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "total_seats": 8, "prep_gap_minutes": 20 }}"#).unwrap();

    let mut config = DepartmentConfig::from_path(file.path()).unwrap();
    assert_eq!(config.total_seats, 8);
    assert_eq!(config.prep_gap_minutes, 20);
    assert_eq!(config.closing_minute, DepartmentConfig::default().closing_minute);

    let mut overrides = HashMap::new();
    overrides.insert(config_keys::TOTAL_SEATS.to_string(), "10".to_string());
    config.apply_overrides(&overrides).unwrap();
    assert_eq!(config.total_seats, 10);

    overrides.insert(config_keys::CLOSING_MINUTE.to_string(), "100".to_string());
    assert!(config.apply_overrides(&overrides).is_err());
}

#[test]
fn test_report_serializes_alert_codes() {
    let catalog = catalog();
    let config = DepartmentConfig {
        total_seats: 1,
        ..Default::default()
    };
    let days: Vec<DayContextInput> = serde_json::from_str(DAYS_JSON).unwrap();
    let result = WeekDistributor::new(&catalog, &config)
        .distribute(&[TreatmentRequest { medication_id: "RITUX".into(), occurrence: 2, quantity: 1 }], &days)
        .unwrap();

    let date = result.placed[0].date;
    let report = WorkloadReporter::new(&config).build_report(date, &result.placed, 3);
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["alerts"][0]["kind"], "HIGH_UTILIZATION");
    assert_eq!(json["peakOccupants"], 1);
}
