//! Table output for miner snapshots using comfy-table.

use std::env;

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use num_bigint::BigInt;
use num_traits::Signed;

use crate::domain::models::{
    ClusterAssetInfo, ProvingInfo, PushedMinerInfo, StorageInfo, TokenAmount, WorkerTaskState,
    ATTO_PER_FIL,
};

/// Table formatter for CLI output
pub struct TableFormatter {
    /// Whether to use colors in output
    use_colors: bool,
    /// Maximum width for tables (None = auto)
    max_width: Option<usize>,
}

impl TableFormatter {
    /// Formatter with colors and no width limit.
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
            max_width: None,
        }
    }

    /// Formatter with explicit color and width settings.
    pub fn with_config(use_colors: bool, max_width: Option<usize>) -> Self {
        Self {
            use_colors,
            max_width,
        }
    }

    /// All sections of one miner snapshot, separated by blank lines.
    pub fn format_snapshot(&self, info: &PushedMinerInfo) -> String {
        let sectors = format!(
            "Sectors: {} total, {} proving",
            info.miner_sectors_info.total_sectors, info.miner_sectors_info.proving
        );
        [
            format!("Miner {}", info.miner_id),
            self.format_assets(&info.cluster_asset_info),
            self.format_proving(&info.proving_info),
            sectors,
            self.format_workers(&info.worker_task_state),
            self.format_storage(&info.storage_info),
        ]
        .join("\n\n")
    }

    /// Balances table, amounts in FIL.
    pub fn format_assets(&self, assets: &ClusterAssetInfo) -> String {
        let mut table = self.key_value_table();
        let available = if assets.available_balance.is_negative() && self.use_colors {
            Cell::new(format_fil(&assets.available_balance)).fg(Color::Red)
        } else {
            Cell::new(format_fil(&assets.available_balance))
        };

        table.add_row(vec![
            Cell::new("Miner balance"),
            Cell::new(format_fil(&assets.miner_balance)),
        ]);
        table.add_row(vec![
            Cell::new("Vesting"),
            Cell::new(format_fil(&assets.vesting_funds)),
        ]);
        table.add_row(vec![
            Cell::new("Initial pledge"),
            Cell::new(format_fil(&assets.initial_pledge_requirement)),
        ]);
        table.add_row(vec![
            Cell::new("Pre-commit deposits"),
            Cell::new(format_fil(&assets.pre_commit_deposits)),
        ]);
        table.add_row(vec![Cell::new("Available"), available]);
        table.add_row(vec![
            Cell::new("PoSt balance"),
            Cell::new(format_fil(&assets.post_balance)),
        ]);
        table.add_row(vec![
            Cell::new("Worker balance"),
            Cell::new(format_fil(&assets.worker_balance)),
        ]);
        table.add_row(vec![
            Cell::new("Owner balance"),
            Cell::new(format_fil(&assets.owner_balance)),
        ]);
        table.add_row(vec![
            Cell::new("QA power"),
            Cell::new(format_bytes_big(&assets.quality_adj_power.0)),
        ]);
        table.to_string()
    }

    /// Proving period table.
    pub fn format_proving(&self, proving: &ProvingInfo) -> String {
        let mut table = self.key_value_table();
        let rows = [
            ("Current epoch", proving.current_epoch.to_string()),
            (
                "Proving period boundary",
                proving.proving_period_boundary.to_string(),
            ),
            ("Proving period start", proving.proving_period_start.clone()),
            ("Next period start", proving.next_period_start.clone()),
            ("Faults", proving.faults.clone()),
            ("Recovering", proving.recovering.to_string()),
            ("Deadline index", proving.deadline_index.to_string()),
            ("Deadline sectors", proving.deadline_sectors.to_string()),
            ("Deadline open", proving.deadline_open.clone()),
            ("Deadline close", proving.deadline_close.clone()),
            ("Deadline challenge", proving.deadline_challenge.clone()),
            (
                "Deadline fault cutoff",
                proving.deadline_fault_cutoff.clone(),
            ),
            ("Deadline window", proving.deadline_elapsed.clone()),
        ];
        for (label, value) in rows {
            table.add_row(vec![Cell::new(label), Cell::new(value)]);
        }
        table.to_string()
    }

    /// One row per worker task; idle workers get a single row.
    pub fn format_workers(&self, workers: &[WorkerTaskState]) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            Cell::new("Worker").add_attribute(Attribute::Bold),
            Cell::new("Host").add_attribute(Attribute::Bold),
            Cell::new("Enabled").add_attribute(Attribute::Bold),
            Cell::new("Tasks").add_attribute(Attribute::Bold),
        ]);

        for worker in workers {
            let tasks = if worker.sector_states.is_empty() {
                "-".to_string()
            } else {
                worker
                    .sector_states
                    .iter()
                    .map(|s| format!("{}:{}", s.task, s.sector_num))
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            let enabled = if self.use_colors {
                let color = if worker.enable {
                    Color::Green
                } else {
                    Color::Yellow
                };
                Cell::new(worker.enable).fg(color)
            } else {
                Cell::new(worker.enable)
            };
            table.add_row(vec![
                Cell::new(truncate_text(&worker.id, 12)),
                Cell::new(&worker.hostname),
                enabled,
                Cell::new(tasks),
            ]);
        }
        table.to_string()
    }

    /// One row per storage path with its usage.
    pub fn format_storage(&self, paths: &[StorageInfo]) -> String {
        let mut table = self.create_base_table();
        table.set_header(vec![
            Cell::new("Storage").add_attribute(Attribute::Bold),
            Cell::new("Sectors").add_attribute(Attribute::Bold),
            Cell::new("Capacity").add_attribute(Attribute::Bold),
            Cell::new("Available").add_attribute(Attribute::Bold),
            Cell::new("Reserved").add_attribute(Attribute::Bold),
        ]);

        for path in paths {
            table.add_row(vec![
                Cell::new(truncate_text(&path.id, 12)),
                Cell::new(path.sectors.len()),
                Cell::new(format_bytes(path.capacity)),
                Cell::new(format_bytes(path.available)),
                Cell::new(format_bytes(path.reserved)),
            ]);
        }
        table.to_string()
    }

    fn key_value_table(&self) -> Table {
        let mut table = self.create_base_table();
        table.set_header(vec![
            Cell::new("Field").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);
        table
    }

    fn create_base_table(&self) -> Table {
        let mut table = Table::new();

        table
            .load_preset(presets::UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        if let Some(width) = self.max_width {
            table.set_width(u16::try_from(width).unwrap_or(u16::MAX));
        }

        table
    }
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if color output is supported
fn supports_color() -> bool {
    // Respect NO_COLOR environment variable
    if env::var("NO_COLOR").is_ok() {
        return false;
    }

    !matches!(env::var("TERM").as_deref(), Ok("dumb"))
}

/// Render an attoFIL amount as FIL without trailing zeros.
pub fn format_fil(amount: &TokenAmount) -> String {
    let atto = BigInt::from(ATTO_PER_FIL);
    let abs = amount.0.abs();
    let whole = &abs / &atto;
    let frac = format!("{:0>18}", (&abs % &atto).to_string());
    let frac = frac.trim_end_matches('0');
    let sign = if amount.is_negative() { "-" } else { "" };

    if frac.is_empty() {
        format!("{sign}{whole} FIL")
    } else {
        format!("{sign}{whole}.{frac} FIL")
    }
}

const BYTE_UNITS: [&str; 7] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB", "EiB"];

/// Binary-unit size such as `1.5 GiB`.
pub fn format_bytes(bytes: i64) -> String {
    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64;
    let mut unit = 0;
    while value.abs() >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", BYTE_UNITS[unit])
    }
}

fn format_bytes_big(bytes: &BigInt) -> String {
    i64::try_from(bytes).map_or_else(|_| format!("{bytes} B"), format_bytes)
}

fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{SectorState, StorageDecl};
    use chrono::Utc;

    #[test]
    fn test_format_fil() {
        assert_eq!(format_fil(&TokenAmount::from_fil(3)), "3 FIL");
        assert_eq!(format_fil(&TokenAmount::zero()), "0 FIL");
        assert_eq!(
            format_fil(&TokenAmount::from_atto(1_500_000_000_000_000_000_u64)),
            "1.5 FIL"
        );
        assert_eq!(
            format_fil(&TokenAmount::from_atto(-250_000_000_000_000_000_i64)),
            "-0.25 FIL"
        );
        assert_eq!(
            format_fil(&TokenAmount::from_atto(1)),
            "0.000000000000000001 FIL"
        );
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.50 KiB");
        assert_eq!(format_bytes(34_359_738_368), "32.00 GiB");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 12), "short");
        assert_eq!(truncate_text("0123456789abcdef", 12), "012345678...");
    }

    #[test]
    fn test_format_workers_and_storage() {
        let formatter = TableFormatter::with_config(false, Some(120));
        let workers = vec![WorkerTaskState {
            id: "w-1".to_string(),
            hostname: "sealer-01".to_string(),
            enable: true,
            sector_states: vec![SectorState {
                task: "PC1".to_string(),
                sector_num: 42,
                start: Utc::now(),
                run_wait: 0,
            }],
        }];
        let rendered = formatter.format_workers(&workers);
        assert!(rendered.contains("sealer-01"));
        assert!(rendered.contains("PC1:42"));

        let storage = vec![StorageInfo {
            id: "store-a".to_string(),
            sectors: vec![StorageDecl {
                miner: "1000".to_string(),
                sector_number: "42".to_string(),
                sector_file_type: "sealed".to_string(),
            }],
            capacity: 1024 * 1024,
            ..StorageInfo::default()
        }];
        let rendered = formatter.format_storage(&storage);
        assert!(rendered.contains("store-a"));
        assert!(rendered.contains("1.00 MiB"));
    }
}
