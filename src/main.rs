// ==========================================
// 输液日间治疗排程系统 - 命令行入口
// ==========================================
// 用法:
//   infusion-aps distribute <scenario.json> [config.json]
//   infusion-aps optimize   <scenario.json> [config.json]
//   infusion-aps report     <scenario.json> [config.json]
//
// 结果 JSON 输出到 stdout, 日志输出到 stderr
// ==========================================

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use infusion_aps::domain::{DailyRoster, ExistingTreatment, Medication, TreatmentPlacement, TreatmentRequest};
use infusion_aps::engine::{DayContextInput, DayOptimizer, WeekDistributor, WorkloadReporter};
use infusion_aps::{logging, DepartmentConfig, MedicationCatalog};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// 场景文件 (各子命令只读取自己需要的字段)
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Scenario {
    /// 内嵌科室配置 (命令行传入 config.json 时被覆盖)
    config: Option<DepartmentConfig>,
    medications: Vec<Medication>,

    // distribute
    requests: Vec<TreatmentRequest>,
    days: Vec<DayContextInput>,

    // optimize
    roster: Option<DailyRoster>,
    treatments: Vec<ExistingTreatment>,

    // report
    date: Option<NaiveDate>,
    placements: Vec<TreatmentPlacement>,
    staff_count: Option<usize>,
}

fn main() -> Result<()> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let (command, scenario_path) = match (args.next(), args.next()) {
        (Some(c), Some(p)) => (c, p),
        _ => bail!("usage: infusion-aps <distribute|optimize|report> <scenario.json> [config.json]"),
    };

    let scenario = load_scenario(&scenario_path)?;
    let config = match args.next() {
        Some(path) => DepartmentConfig::from_path(&path).with_context(|| format!("加载配置失败: {}", path))?,
        None => match scenario.config.clone() {
            Some(config) => {
                config.validate().context("场景内配置无效")?;
                config
            }
            None => DepartmentConfig::default(),
        },
    };
    let catalog = MedicationCatalog::new(scenario.medications.clone());

    info!(
        "{} v{} - {} (药品 {} 种)",
        infusion_aps::APP_NAME,
        infusion_aps::VERSION,
        command,
        catalog.len()
    );

    let output = match command.as_str() {
        "distribute" => {
            let result = WeekDistributor::new(&catalog, &config).distribute(&scenario.requests, &scenario.days)?;
            serde_json::to_string_pretty(&result)?
        }
        "optimize" => {
            let roster = scenario.roster.as_ref().context("optimize 需要 roster")?;
            let result = DayOptimizer::new(&catalog, &config).optimize(roster, &scenario.treatments)?;
            serde_json::to_string_pretty(&result)?
        }
        "report" => {
            let date = scenario
                .date
                .or_else(|| scenario.placements.first().map(|p| p.date))
                .context("report 需要 date 或至少一条 placement")?;
            let staff_count = scenario
                .staff_count
                .or_else(|| scenario.roster.as_ref().map(|r| r.staff.len()))
                .unwrap_or(0);
            let report = WorkloadReporter::new(&config).build_report(date, &scenario.placements, staff_count);
            serde_json::to_string_pretty(&report)?
        }
        other => bail!("unknown command: {}", other),
    };

    println!("{}", output);
    Ok(())
}

fn load_scenario(path: impl AsRef<Path>) -> Result<Scenario> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).with_context(|| format!("读取场景文件失败: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("解析场景文件失败: {}", path.display()))
}
