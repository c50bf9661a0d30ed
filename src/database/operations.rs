/// Database operations for storing sensor readings
use time::OffsetDateTime;
use tokio_postgres::types::ToSql;

use crate::database::connection::execute_with_retry;
use crate::models::{SensorData, Value};

/// One row per reading. Columns of categories that were not read stay NULL.
pub const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS metriful (
    "timestamp" TIMESTAMPTZ NOT NULL,

    "T_C" DOUBLE PRECISION,
    "P_Pa" BIGINT,
    "H_pc" DOUBLE PRECISION,
    "G_ohm" BIGINT,

    "AQI" DOUBLE PRECISION,
    "AQI_value" TEXT,
    "CO2e" DOUBLE PRECISION,
    "bVOC" DOUBLE PRECISION,
    "AQI_accuracy" TEXT,

    "illum_lux" DOUBLE PRECISION,
    "white" BIGINT,

    "SPL_dBA" DOUBLE PRECISION,
    "SPL_bands_dB_1" DOUBLE PRECISION,
    "SPL_bands_dB_2" DOUBLE PRECISION,
    "SPL_bands_dB_3" DOUBLE PRECISION,
    "SPL_bands_dB_4" DOUBLE PRECISION,
    "SPL_bands_dB_5" DOUBLE PRECISION,
    "SPL_bands_dB_6" DOUBLE PRECISION,
    "peak_amp_mPa" DOUBLE PRECISION,
    "stable" TEXT,

    "duty_cycle_pc" DOUBLE PRECISION,
    "concentration" DOUBLE PRECISION,
    "conc_unit" TEXT,
    "valid" TEXT
)"#;

/// Create the readings table if it does not exist yet
pub async fn ensure_schema(database_url: &str) -> Result<(), String> {
    execute_with_retry(database_url, |client| async move {
        client.execute(CREATE_TABLE, &[]).await
    })
    .await
}

/// Build an INSERT naming the timestamp column followed by `columns`.
pub fn insert_statement<'a>(columns: impl IntoIterator<Item = &'a str>) -> String {
    let mut names = vec![r#""timestamp""#.to_string()];
    names.extend(columns.into_iter().map(|column| format!("\"{}\"", column)));

    let placeholders = (1..=names.len())
        .map(|index| format!("${}", index))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO metriful ({}) VALUES ({})",
        names.join(", "),
        placeholders
    )
}

fn sql_param(value: &Value) -> &(dyn ToSql + Sync) {
    match value {
        Value::Number(number) => number,
        Value::Integer(integer) => integer,
        Value::Name(name) => name,
    }
}

/// Store one reading captured at `captured_at`
///
/// Only the fields present in `data` are inserted. Enumerated values are
/// stored by their symbolic name.
pub async fn store_measurement(
    data: &SensorData,
    captured_at: OffsetDateTime,
    database_url: &str,
) -> Result<(), String> {
    let fields = data.fields();
    let statement = insert_statement(fields.iter().map(|(name, _)| *name));

    execute_with_retry(database_url, move |client| {
        let fields = fields.clone();
        let statement = statement.clone();
        async move {
            let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(fields.len() + 1);
            params.push(&captured_at);
            params.extend(fields.iter().map(|(_, value)| sql_param(value)));

            client.execute(statement.as_str(), &params).await
        }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_names_only_given_columns() {
        let statement = insert_statement(["T_C", "AQI_value"]);
        assert_eq!(
            statement,
            r#"INSERT INTO metriful ("timestamp", "T_C", "AQI_value") VALUES ($1, $2, $3)"#
        );
    }

    #[test]
    fn every_field_has_a_column() {
        let columns = [
            "T_C", "P_Pa", "H_pc", "G_ohm", "AQI", "AQI_value", "CO2e", "bVOC", "AQI_accuracy",
            "illum_lux", "white", "SPL_dBA", "SPL_bands_dB_6", "peak_amp_mPa", "stable",
            "duty_cycle_pc", "concentration", "conc_unit", "valid",
        ];
        for column in columns {
            assert!(
                CREATE_TABLE.contains(&format!("\"{}\"", column)),
                "missing column {column}"
            );
        }
    }
}
