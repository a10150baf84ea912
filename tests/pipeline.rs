use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

use port_report::config::ReportConfig;
use port_report::dataset::SectionOutcome;
use port_report::pipeline::{build_report, run_delays, Session};
use port_report::types::MonthKey;
use port_report::Error;

const VESSEL_HEADER: &str = "Navio / Viagem,Berço,Serviço,Chegada na Barra,Atracação,Estimativa Atracação ETB,\
Início Operação,Fim Operação,Desatracação,Liberação RFB,Movs";

const VESSEL_ROWS: &[&str] = &[
    "V1/01,B1,ASIA,01/01/2024 00:00,01/01/2024 12:00,01/01/2024 10:00,01/01/2024 12:30,01/01/2024 20:30,01/01/2024 22:00,01/01/2024 23:00,100",
    "V2/01,B2,ASIA,01/01/2024 06:00,02/01/2024 08:30,02/01/2024 08:00,02/01/2024 09:00,02/01/2024 11:00,02/01/2024 12:00,02/01/2024 11:30,0",
    "V3/01,B1,EURO,02/01/2024 00:00,03/01/2024 00:00,03/01/2024 00:00,03/01/2024 01:00,03/01/2024 05:00,03/01/2024 06:00,,50",
];

const TRADE_HEADER: &str = "Mês,Município,País,Descrição Seção,Exportação - 2024 - Valor US$ FOB,\
Exportação - 2024 - Quilograma Líquido,Importação - 2024 - Quilograma Líquido";

const TRADE_ROWS: &[&str] = &[
    "01 - Janeiro,Santos,China,Sec A,1000,10,5",
    "01 - Janeiro,Santos,Estados Unidos,Sec B,500,2,0",
    "02 - Fevereiro,Campinas,China,Sec A,500,5,5",
];

fn write_source(dir: &Path, name: &str, header: &str, rows: &[&str]) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut body = format!("{}\n", header);
    for r in rows {
        body.push_str(r);
        body.push('\n');
    }
    fs::write(&path, body).unwrap();
    path
}

fn setup(with_trade: bool) -> (TempDir, ReportConfig) {
    let dir = tempfile::tempdir().unwrap();
    let vessel_path = write_source(dir.path(), "calls.csv", VESSEL_HEADER, VESSEL_ROWS);
    let trade_path = if with_trade {
        write_source(dir.path(), "trade.csv", TRADE_HEADER, TRADE_ROWS)
    } else {
        dir.path().join("no_such_trade.csv")
    };
    let config = ReportConfig {
        vessel_path,
        trade_path,
        output_dir: dir.path().join("out"),
        ..ReportConfig::default()
    };
    (dir, config)
}

fn data_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .skip(1)
        .map(str::to_string)
        .collect()
}

#[test]
fn delay_run_writes_all_five_tables() {
    let (_dir, config) = setup(false);
    let mut session = Session::new();
    let written = run_delays(&mut session, &config).unwrap();

    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "anchorage_wait_outliers.csv",
            "etb_delay.csv",
            "above_mean_dwell.csv",
            "waiting_census.csv",
            "customs_release_delay.csv",
        ]
    );
}

#[test]
fn etb_table_lists_only_the_late_berthing() {
    let (_dir, config) = setup(false);
    run_delays(&mut Session::new(), &config).unwrap();

    let rows = data_lines(&config.output_dir.join("etb_delay.csv"));
    assert_eq!(rows.len(), 1);
    assert!(rows[0].starts_with("V1/01,B1,2024-01-01 10:00:00,2024-01-01 12:00:00,"));
}

#[test]
fn delay_thresholds_follow_their_policies() {
    let (_dir, config) = setup(false);
    run_delays(&mut Session::new(), &config).unwrap();
    let first_field = |file: &str| -> Vec<String> {
        data_lines(&config.output_dir.join(file))
            .iter()
            .map(|l| l.split(',').next().unwrap_or_default().to_string())
            .collect()
    };

    // waits 12, 26.5 and 24 hours; upper quartile is 25.25
    assert_eq!(first_field("anchorage_wait_outliers.csv"), vec!["V2/01"]);
    // operation hours 8, 2 and 4; mean is 4.67
    assert_eq!(first_field("above_mean_dwell.csv"), vec!["V1/01"]);
    // V3 has no release time
    assert_eq!(first_field("customs_release_delay.csv"), vec!["V1/01"]);
}

#[test]
fn waiting_census_counts_vessels_at_anchorage() {
    let (_dir, config) = setup(false);
    run_delays(&mut Session::new(), &config).unwrap();

    assert_eq!(
        data_lines(&config.output_dir.join("waiting_census.csv")),
        vec![
            "2024-01-01 00:00:00,1",
            "2024-01-02 00:00:00,2",
            "2024-01-03 00:00:00,0",
        ]
    );
}

#[test]
fn missing_trade_file_only_disables_trade_sections() {
    let (_dir, config) = setup(false);
    let report = build_report(&mut Session::new(), &config).unwrap();

    assert!(report.movements.ready().is_some());
    assert!(report.stay_vs_operation.ready().is_some());
    assert!(matches!(report.trade_seasonality, SectionOutcome::Unavailable(_)));
    assert!(matches!(report.country_concentration, SectionOutcome::Unavailable(_)));
    assert!(matches!(report.high_value_sections, SectionOutcome::Unavailable(_)));
    assert_eq!(report.summary.trade_records, None);
}

#[test]
fn dashboard_drops_calls_without_movements() {
    let (_dir, config) = setup(false);
    let report = build_report(&mut Session::new(), &config).unwrap();

    assert_eq!(report.summary.total_vessel_calls, 2);
    let january = MonthKey { year: 2024, month: 1 };
    assert_eq!(report.summary.first_month, Some(january));
    assert_eq!(report.summary.last_month, Some(january));

    let movements = report.movements.ready().unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].total_movements, 150.0);
}

#[test]
fn trade_sections_rank_countries_and_sections() {
    let (_dir, config) = setup(true);
    let report = build_report(&mut Session::new(), &config).unwrap();

    let seasonality: Vec<(u32, f64)> = report
        .trade_seasonality
        .ready()
        .unwrap()
        .iter()
        .map(|r| (r.month, r.total_kg))
        .collect();
    assert_eq!(seasonality, vec![(1, 17.0), (2, 10.0)]);

    let concentration = report.country_concentration.ready().unwrap();
    assert_eq!(concentration.top[0].country, "China");
    assert_eq!(concentration.top[0].share_pct, 75.0);
    assert_eq!(concentration.top3_share_pct, 100.0);

    let sections: Vec<String> = report
        .high_value_sections
        .ready()
        .unwrap()
        .iter()
        .map(|r| r.section.clone())
        .collect();
    assert_eq!(sections, vec!["Sec B".to_string(), "Sec A".to_string()]);
    assert_eq!(report.summary.trade_records, Some(3));
}

#[test]
fn missing_required_column_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let header = VESSEL_HEADER.replace(",Movs", ",Other");
    let vessel_path = write_source(dir.path(), "calls.csv", &header, VESSEL_ROWS);
    let config = ReportConfig {
        vessel_path,
        output_dir: dir.path().join("out"),
        ..ReportConfig::default()
    };

    match run_delays(&mut Session::new(), &config) {
        Err(Error::MissingColumns { table, missing }) => {
            assert_eq!(table, "vessel");
            assert_eq!(missing.len(), 1);
            assert!(missing[0].starts_with("movements"));
        }
        other => panic!("expected missing columns, got {:?}", other.map(|p| p.len())),
    }
}

#[test]
fn sources_are_loaded_once_per_session() {
    let (_dir, config) = setup(false);
    let mut session = Session::new();
    let first = session.dashboard_vessels(&config).unwrap();
    let second = session.dashboard_vessels(&config).unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &second));

    // the delay view parses separately and keeps the zero-movement call
    let delays = session.delay_vessels(&config).unwrap();
    assert_eq!(delays.calls.len(), 3);
    assert_eq!(first.calls.len(), 2);
}
