use crate::liquidity::PriceRange;
use crate::screener::{AssetReport, OutputData};
use crate::stage::Stage;
use crate::storage_utils::AsyncStorageManager;
use crate::timeframe::{TimeframeAnalysis, Timeframe};
use anyhow::Result;
use chrono::DateTime;
use comfy_table::{
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_BORDERS_ONLY, Attribute, Cell, CellAlignment,
    Color, ContentArrangement, Table,
};

/// Terminal colour per stage.
pub fn stage_color(stage: Stage) -> Color {
    match stage {
        Stage::Accumulation => Color::Cyan,
        Stage::Bullish => Color::Green,
        Stage::Distribution => Color::Yellow,
        Stage::Bearish => Color::Red,
    }
}

pub fn format_timestamp(ts_ms: i64) -> String {
    if ts_ms == 0 {
        return "Never".to_string();
    }
    DateTime::from_timestamp_millis(ts_ms)
        .map(|dt| dt.format("%d-%m-%Y %H:%M:%S").to_string())
        .unwrap_or_else(|| "Unknown Time".to_string())
}

/// Formats a price with precision suited to its magnitude.
pub fn format_price(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1000.0 {
        format!("{value:.2}")
    } else if abs >= 1.0 {
        format!("{value:.4}")
    } else {
        format!("{value:.6}")
    }
}

pub fn format_range(range: &PriceRange) -> String {
    format!("{} – {}", format_price(range.min), format_price(range.max))
}

fn header(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|t| Cell::new(t).add_attribute(Attribute::Bold))
        .collect()
}

fn timeframe_cell(analysis: Option<&TimeframeAnalysis>) -> Cell {
    match analysis {
        Some(a) => Cell::new(format!("{} · RSI {:.0}", a.stage.name(), a.rsi)).fg(stage_color(a.stage)),
        None => Cell::new("n/a").fg(Color::DarkGrey),
    }
}

fn asset_row(asset: &AssetReport) -> Vec<Cell> {
    let symbol = Cell::new(&asset.symbol).fg(Color::Rgb { r: 0, g: 255, b: 255 });
    let class = Cell::new(asset.class.to_string()).fg(Color::DarkGrey);

    let Some(market) = &asset.market else {
        return vec![
            symbol,
            class,
            Cell::new("insufficient data").fg(Color::DarkGrey),
        ];
    };

    let daily = &market.daily;
    let mut row = vec![
        symbol,
        class,
        Cell::new(format_price(daily.price)).set_alignment(CellAlignment::Right),
        Cell::new(format_price(daily.ma20)).set_alignment(CellAlignment::Right),
    ];
    row.extend(Timeframe::all().iter().map(|&tf| timeframe_cell(market.get(tf))));
    row.push(Cell::new(daily.stage.action()).fg(stage_color(daily.stage)));
    row.push(Cell::new(format_price(daily.pivots.s1)).set_alignment(CellAlignment::Right));
    row.push(Cell::new(format_price(daily.pivots.r1)).set_alignment(CellAlignment::Right));
    row
}

pub fn stage_table(data: &OutputData) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&[
            "Asset", "Type", "Price", "MA20", "Daily", "Weekly", "Monthly", "Action", "S1", "R1",
        ]));

    for asset in &data.assets {
        table.add_row(asset_row(asset));
    }
    table
}

pub fn pair_table(data: &OutputData) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_BORDERS_ONLY)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&[
            "Pair", "Window", "Corr", "Ratio", "Vol (%)", "Conservative", "Aggressive", "Acquisition",
        ]));

    for pair in &data.pairs {
        let name = match &pair.ranges {
            Some(r) if r.inverted => format!("{}/{}", pair.quote, pair.base),
            _ => format!("{}/{}", pair.base, pair.quote),
        };
        let mut row = vec![
            Cell::new(name).fg(Color::Rgb { r: 0, g: 255, b: 255 }),
            Cell::new(pair.lookback.label()).fg(Color::DarkGrey),
            Cell::new(
                pair.correlation
                    .map(|r| format!("{r:+.3}"))
                    .unwrap_or_else(|| "n/a".to_string()),
            )
            .set_alignment(CellAlignment::Right),
        ];
        match &pair.ranges {
            Some(r) => row.extend([
                Cell::new(format_price(r.current)).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.2}", r.volatility)).set_alignment(CellAlignment::Right),
                Cell::new(format_range(&r.conservative)).fg(Color::Green),
                Cell::new(format_range(&r.aggressive)).fg(Color::Yellow),
                Cell::new(format_range(&r.acquisition)).fg(Color::Magenta),
            ]),
            None => row.push(Cell::new("no data for this period").fg(Color::DarkGrey)),
        }
        table.add_row(row);
    }
    table
}

pub async fn run() -> Result<()> {
    let storage = AsyncStorageManager::new_relative("storage").await?;

    if !storage.exists("results") {
        println!("File not found: {:?}", storage.base_dir.join("results.json"));
        return Ok(());
    }

    let data: OutputData = storage.load("results").await?;

    if data.assets.is_empty() && data.pairs.is_empty() {
        println!("No data found.");
        return Ok(());
    }

    let title = format!(
        "(Data taken at {} UTC)",
        format_timestamp(data.last_updated_timestamp)
    );

    println!("\n{}\n{}", title, stage_table(&data));
    if !data.pairs.is_empty() {
        println!("\n{}", pair_table(&data));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candle::Candle;
    use crate::klines::SymbolKlines;
    use crate::screener::build_report;
    use crate::storage_utils::AppConfig;

    #[test]
    fn price_precision_follows_magnitude() {
        assert_eq!(format_price(67000.123), "67000.12");
        assert_eq!(format_price(1.5), "1.5000");
        assert_eq!(format_price(0.0321), "0.032100");
    }

    #[test]
    fn timestamps() {
        assert_eq!(format_timestamp(0), "Never");
        assert_eq!(format_timestamp(86_400_000), "02-01-1970 00:00:00");
    }

    #[test]
    fn tables_render_every_asset_and_pair() {
        let daily: Vec<Candle> = (0..30)
            .map(|i| {
                let c = 100.0 + i as f64;
                Candle::new(i * 86_400_000, c, c, c, c, 0.0)
            })
            .collect();
        let klines = vec![
            SymbolKlines { symbol: "BTCUSDT".into(), daily: daily.clone(), ..Default::default() },
            SymbolKlines { symbol: "ETHUSDT".into(), daily, ..Default::default() },
        ];
        let data = build_report(&AppConfig::default(), &klines);

        let stages = stage_table(&data).to_string();
        assert!(stages.contains("BTCUSDT"));
        assert!(stages.contains("Bullish"));
        assert!(stages.contains("insufficient data")); // SOLUSDT has no klines

        let pairs = pair_table(&data).to_string();
        assert!(pairs.contains("ETHUSDT/BTCUSDT"));
        assert!(pairs.contains("no data for this period")); // SOL/ETH
    }
}
