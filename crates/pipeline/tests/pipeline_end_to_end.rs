//! End-to-end pipeline test: 3 days of 5-minute data for two entities in
//! two families, CSV in, Parquet + manifest out.

use std::f64::consts::PI;
use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use arrow::array::{Array, Float64Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use volumetria_pipeline::{build_and_save_features, Manifest};

const PERIODS_PER_DAY: usize = 288;

fn init_logging() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .ok();
}

/// Deterministic sample records: a daily sinusoidal pattern per entity,
/// starting 2024-12-31 so the window crosses New Year's Day.
fn write_sample_csv(path: &Path, days: usize) {
    let mut file = File::create(path).unwrap();
    writeln!(file, "anio,mes,dia,hora,api_name,familia,llamados").unwrap();

    let entities = [("api_A", "fam1", 50.0), ("api_B", "fam2", 10.0)];
    // 2024-12-31, 2025-01-01, 2025-01-02
    let dates = [(2024, 12, 31), (2025, 1, 1), (2025, 1, 2)];
    assert!(days <= dates.len());

    for (api, familia, base) in entities {
        for (anio, mes, dia) in dates.iter().take(days) {
            for period in 0..PERIODS_PER_DAY {
                let secs = period * 300;
                let hora = format!("{:02}:{:02}:00", secs / 3_600, (secs % 3_600) / 60);
                let hour_frac = secs as f64 / 86_400.0;
                let llamados = (base + 10.0 * (2.0 * PI * hour_frac).sin()).max(0.0) as i64;
                writeln!(
                    file,
                    "{anio},{mes},{dia},{hora},{api},{familia},{llamados}"
                )
                .unwrap();
            }
        }
    }
}

fn write_config(path: &Path, historic: &Path, output_dir: &Path) {
    let yaml = format!(
        "historic_path: {}\noutput_dir: {}\nfeatures:\n  freq: 5min\n  lag_list: [1, 2, 3]\n  rolling_windows: [12, 36]\n  ema_spans: [12]\n",
        historic.display(),
        output_dir.display()
    );
    fs::write(path, yaml).unwrap();
}

fn read_batches(path: &Path) -> Vec<RecordBatch> {
    let file = File::open(path).unwrap();
    ParquetRecordBatchReaderBuilder::try_new(file)
        .unwrap()
        .with_batch_size(1 << 20)
        .build()
        .unwrap()
        .map(|batch| batch.unwrap())
        .collect()
}

fn column_index(batch: &RecordBatch, name: &str) -> usize {
    batch.schema().index_of(name).unwrap()
}

fn float_column<'a>(batch: &'a RecordBatch, name: &str) -> &'a Float64Array {
    batch
        .column(column_index(batch, name))
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap()
}

fn run_pipeline(dir: &Path, output_name: &str) -> PathBuf {
    let historic = dir.join("historic.csv");
    if !historic.exists() {
        write_sample_csv(&historic, 3);
    }
    let output_dir = dir.join(output_name);
    let config_path = dir.join(format!("{output_name}.yaml"));
    write_config(&config_path, &historic, &output_dir);
    build_and_save_features(&config_path).unwrap()
}

#[test]
fn test_end_to_end_shape_and_features() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let out_path = run_pipeline(dir.path(), "out");

    let batches = read_batches(&out_path);
    let total_rows: usize = batches.iter().map(|b| b.num_rows()).sum();
    // 3 days of 5-minute data per entity
    assert_eq!(total_rows, 2 * 3 * PERIODS_PER_DAY);

    // manifest matches the table shape
    let manifest_text = fs::read_to_string(dir.path().join("out/manifest.yaml")).unwrap();
    let manifest: Manifest = serde_yaml::from_str(&manifest_text).unwrap();
    assert_eq!(manifest.rows, total_rows);
    assert_eq!(manifest.cols, batches[0].schema().fields().len());
    assert!(manifest.path.ends_with("features.parquet"));

    for batch in &batches {
        // no 4 prior same-weekday occurrences exist within 3 days
        for metric in ["sum", "mean", "median", "max", "min", "std", "q25", "q75"] {
            let column = float_column(batch, &format!("prev_dow_day_{metric}"));
            assert!(
                (0..column.len()).all(|i| column.value(i) == 0.0),
                "prev_dow_day_{metric} should be zero-filled"
            );
        }

        // holiday is 1 exactly on New Year's Day
        let holiday = float_column(batch, "holiday");
        let month = float_column(batch, "month");
        let day = float_column(batch, "day_of_month");
        for i in 0..batch.num_rows() {
            let expected = if month.value(i) == 1.0 && day.value(i) == 1.0 {
                1.0
            } else {
                0.0
            };
            assert_eq!(holiday.value(i), expected, "row {i}");
        }

        // fully observed input: nothing imputed
        let imputed = batch
            .column(column_index(batch, "imputed_flag"))
            .as_any()
            .downcast_ref::<Int64Array>()
            .unwrap();
        assert!((0..imputed.len()).all(|i| imputed.value(i) == 0));

        // no missing feature values anywhere
        for field in batch.schema().fields() {
            let column = batch.column(column_index(batch, field.name()));
            assert_eq!(column.null_count(), 0, "column {}", field.name());
        }
    }
}

#[test]
fn test_end_to_end_group_blocks() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let out_path = run_pipeline(dir.path(), "out");
    let batches = read_batches(&out_path);

    // rows are concatenated per group in enumeration order
    let mut apis = Vec::new();
    for batch in &batches {
        let api = batch
            .column(column_index(batch, "api_name"))
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        for i in 0..batch.num_rows() {
            apis.push(api.value(i).to_string());
        }
    }
    assert_eq!(apis.len(), 2 * 3 * PERIODS_PER_DAY);
    assert!(apis[..3 * PERIODS_PER_DAY].iter().all(|a| a == "api_A"));
    assert!(apis[3 * PERIODS_PER_DAY..].iter().all(|a| a == "api_B"));
}

#[test]
fn test_end_to_end_previous_day_alignment() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let out_path = run_pipeline(dir.path(), "out");
    let batches = read_batches(&out_path);
    assert_eq!(batches.len(), 1);
    let batch = &batches[0];

    let llamados = float_column(batch, "llamados");
    let prev_dia_sum = float_column(batch, "prev_dia_com_sum");

    // api_A rows 0..864; day 1 is rows 0..288
    let day1_sum: f64 = (0..PERIODS_PER_DAY).map(|i| llamados.value(i)).sum();
    // first day has no previous day: zero after the final fill
    assert_eq!(prev_dia_sum.value(0), 0.0);
    assert_eq!(prev_dia_sum.value(PERIODS_PER_DAY - 1), 0.0);
    // every day-2 row sees the full day-1 sum
    assert_eq!(prev_dia_sum.value(PERIODS_PER_DAY), day1_sum);
    assert_eq!(prev_dia_sum.value(2 * PERIODS_PER_DAY - 1), day1_sum);
}

#[test]
fn test_end_to_end_determinism() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let first = run_pipeline(dir.path(), "out_a");
    let second = run_pipeline(dir.path(), "out_b");
    let bytes_a = fs::read(&first).unwrap();
    let bytes_b = fs::read(&second).unwrap();
    assert_eq!(bytes_a, bytes_b, "pipeline output must be byte-identical");
}
