use anggaran_dashboard::*;

fn main() -> anyhow::Result<()> {
    let source = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_SOURCE_URL.to_string());

    let mut session = DashboardSession::open(DashboardConfig::with_source(source))?;
    let overview = session.overview()?;

    println!("Total Anggaran        {}", format_rupiah(overview.kpis.total_budget));
    println!("Total Realisasi       {}", format_rupiah(overview.kpis.total_realized));
    println!("Rata-rata % Realisasi {:.2}%", overview.kpis.realization_percent);
    println!("Total Sisa Anggaran   {}", format_rupiah(overview.kpis.total_remaining));

    println!("\nAnggaran vs Realisasi per Triwulan:");
    for row in overview.by_year_quarter.rows() {
        println!(
            "  {:<10} {:>20} {:>20} {:>7.2}%",
            row.key.label(),
            format_rupiah(row.budget),
            format_rupiah(row.realized),
            row.efficiency_percent()
        );
    }

    println!("\nSisa Anggaran per Jenis Belanja:");
    for row in &overview.remaining_by_category {
        println!("  {:<30} {:>20}", row.key, format_rupiah(row.remaining));
    }

    let insights = session.insights()?;
    if let Some(best) = &insights.best_year {
        println!("\nTahun realisasi tertinggi: {} ({})", best.key, format_rupiah(best.realized));
    }
    if let Some(best) = &insights.best_category {
        println!("Jenis belanja tertinggi:   {} ({})", best.key, format_rupiah(best.realized));
    }
    if let Some(best) = &insights.best_quarter {
        println!("Triwulan tertinggi:        {} ({})", best.key.label(), format_rupiah(best.realized));
    }
    if let (Some(low), Some(high)) = (&insights.most_efficient, &insights.needs_attention) {
        println!("Paling efisien:            {} ({:.2}% sisa)", low.category, low.remaining_percent);
        println!("Perlu perhatian:           {} ({:.2}% sisa)", high.category, high.remaining_percent);
    }

    match session.forecast() {
        Ok(forecast) => {
            println!(
                "\nPrediksi Realisasi (R² = {:.3}, {}):",
                forecast.r_squared,
                forecast.assessment.description()
            );
            for row in &forecast.rows {
                println!(
                    "  {:<10} {:<30} {:>20}",
                    row.label(),
                    row.category,
                    format_rupiah(row.predicted_realized)
                );
            }
            let bytes = predictions_workbook(&forecast)?;
            println!("  ({} byte workbook ready for download)", bytes.len());
        }
        Err(e) => println!("\nPrediksi tidak tersedia: {}", e),
    }

    Ok(())
}
