use std::fmt::Write;

use crate::session::SessionReport;
use crate::types::ScoreResult;

/// Tekstrapport for en batch: toppmetrikker, tabell, hoppede økter og innsikt.
pub fn format_session_report(report: &SessionReport) -> String {
    let mut out = String::new();

    let Some(summary) = &report.summary else {
        let _ = writeln!(out, "No workouts could be scored.");
        write_skipped(&mut out, report);
        return out;
    };

    let _ = writeln!(out, "--- CorsaScore Report ---");
    let _ = writeln!(out, "Average CorsaScore: {:.1}", summary.mean_corsa_score);
    let _ = writeln!(out, "Average Score 2.0:  {:.2}", summary.mean_score_2);
    let _ = writeln!(out, "Average decoupling: {:.2}%", summary.mean_decoupling_pct);
    let _ = writeln!(out, "Average watt adj:   {:.0} W", summary.mean_watt_adj);
    let _ = writeln!(out, "Average %HRR:       {:.1}%", summary.mean_hrr_pct);
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "{:<12} {:>8} {:>7} {:>7} {:>7} {:>6}  {}",
        "date", "score2", "corsa", "%hrr", "dec%", "min", "workout"
    );
    for row in &report.rows {
        let date = row
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:<12} {:>8.3} {:>7.1} {:>7.1} {:>7.2} {:>6.0}  {}",
            date,
            row.score_2,
            row.corsa_score,
            row.hrr_pct,
            row.decoupling_pct,
            row.duration_min,
            row.label
        );
    }

    write_skipped(&mut out, report);
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", summary.insight());
    out
}

fn write_skipped(out: &mut String, report: &SessionReport) {
    if report.skipped.is_empty() {
        return;
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Skipped ({}):", report.skipped.len());
    for s in &report.skipped {
        let _ = writeln!(out, "  {}: {}", s.label, s.reason);
    }
}

pub fn print_session_report(report: &SessionReport) {
    print!("{}", format_session_report(report));
}

/// Kortform for én økt.
pub fn format_score(r: &ScoreResult) -> String {
    format!(
        "CorsaScore {:.1} (Score 2.0 {:.3}) | EF {:.3} | decoupling {:.2}% | %HRR {:.1}",
        r.corsa_score, r.raw_score, r.efficiency_factor, r.decoupling_pct, r.hrr_pct
    )
}
