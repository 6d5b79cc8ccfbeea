// ==========================================
// 单日重排 + 负荷报表集成测试
// ==========================================
// 测试目标: 把拥挤的一日重排后,报表预警应减少
// 覆盖范围: 重排结果、失败保持原时间、协调护士、报表预警
// ==========================================

mod helpers;

use helpers::test_data_builder::*;
use infusion_aps::domain::staff::StaffMember;
use infusion_aps::domain::time::hm;
use infusion_aps::domain::treatment::{ExistingTreatment, TreatmentId};
use infusion_aps::engine::AlertKind;
use infusion_aps::{DayOptimizer, DepartmentConfig, WorkloadReporter};

fn existing(medication_id: &str, start: i32) -> ExistingTreatment {
    ExistingTreatment {
        treatment_id: TreatmentId::new(),
        medication_id: medication_id.to_string(),
        occurrence: 1,
        start,
    }
}

#[test]
fn test_crowded_morning_is_spread_out() {
    let catalog = standard_catalog();
    let config = DepartmentConfig {
        total_seats: 4,
        ..Default::default()
    };
    let treatments: Vec<_> = (0..6).map(|_| existing("IRON", hm(8, 0))).collect();

    let result = DayOptimizer::new(&catalog, &config)
        .optimize(&roster(2, &["A", "B", "C"], 10), &treatments)
        .unwrap();

    assert!(result.failed.is_empty());
    assert_eq!(result.new_start_times.len(), 6);
    assert!(result.score.peak_occupancy <= 4);
    let distinct: std::collections::BTreeSet<_> = result.new_start_times.values().collect();
    assert!(distinct.len() > 1);
    for p in &result.placements {
        assert!(p.start >= config.opening_minute);
        assert!(p.end() <= config.closing_minute);
        assert!(!(p.start >= config.lunch_start && p.start < config.lunch_end));
    }
}

#[test]
fn test_optimized_day_reports_no_capacity_alert() {
    let catalog = standard_catalog();
    let config = DepartmentConfig {
        total_seats: 3,
        ..Default::default()
    };
    let roster = roster(2, &["A", "B"], 10);
    let treatments: Vec<_> = (0..5).map(|_| existing("HYDRA", hm(9, 0))).collect();

    let result = DayOptimizer::new(&catalog, &config)
        .optimize(&roster, &treatments)
        .unwrap();
    let report = WorkloadReporter::new(&config).build_report(roster.date, &result.placements, roster.staff.len());

    assert_eq!(report.total_treatments, 5);
    assert!(!report.has_alert(AlertKind::CapacityExceeded));
    assert!(report.peak_occupants <= 3);
}

#[test]
fn test_unplaceable_treatment_keeps_original_time() {
    let catalog = standard_catalog();
    let config = DepartmentConfig::default();
    // 14:00 下班的唯一护士无法在闭科前完成 IVIG 的全部动作
    let roster = infusion_aps::DailyRoster::new(date(2), vec![StaffMember::new("Half", 10).with_max_work_time(120)]);
    let t = existing("IVIG", hm(9, 0));

    let result = DayOptimizer::new(&catalog, &config)
        .optimize(&roster, &[t.clone()])
        .unwrap();
    assert_eq!(result.failed, vec![t.treatment_id]);
    assert_eq!(result.new_start_times[&t.treatment_id], hm(9, 0));
    assert_eq!(result.score.failed_count, 1);
}

#[test]
fn test_coordinator_stays_out_of_blackout() {
    let catalog = standard_catalog();
    let config = DepartmentConfig::default();
    let lead = StaffMember::new("Lead", 10);
    let roster = roster(2, &["A"], 10).with_coordinator(lead.clone());
    let treatments: Vec<_> = (0..4).map(|_| existing("HYDRA", hm(9, 0))).collect();

    let result = DayOptimizer::new(&catalog, &config)
        .optimize(&roster, &treatments)
        .unwrap();

    for p in &result.placements {
        for a in p.actions.iter().filter(|a| a.staff_id == Some(lead.id)) {
            let in_blackout = a.start < config.coordinator_blackout_end && config.coordinator_blackout_start < a.end();
            assert!(!in_blackout, "协调护士在禁区内被分配: {:?}", a);
        }
    }
    let lead_stats = result.staff_stats.iter().find(|s| s.staff_id == lead.id).unwrap();
    assert!(lead_stats.is_coordinator);
    assert!(lead_stats.setup_count <= config.coordinator_max_patients);
}
