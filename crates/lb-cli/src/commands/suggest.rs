//! Suggest command: breaks and focus blocks from recent assessments.

use std::io::Write;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use lb_core::suggest::Suggestion;
use lb_db::Database;

use super::util::write_json;
use crate::analysis::Analyzer;

pub fn format_suggestions<W: Write>(writer: &mut W, suggestions: &[Suggestion]) -> std::io::Result<()> {
    if suggestions.is_empty() {
        writeln!(writer, "No suggestions right now.")?;
        writeln!(writer)?;
        writeln!(writer, "Hint: Suggestions build on 'lb burnout' assessments.")?;
        return Ok(());
    }
    for suggestion in suggestions {
        writeln!(writer, "- {}", suggestion.message)?;
        writeln!(writer, "  ({})", suggestion.reason)?;
    }
    Ok(())
}

pub fn run<W: Write, Tz: TimeZone>(
    writer: &mut W,
    db: &Database,
    analyzer: &Analyzer<Tz>,
    json: bool,
) -> Result<()> {
    let suggestions = analyzer.suggestions(db, Utc::now())?;
    if json {
        write_json(writer, &suggestions)
    } else {
        format_suggestions(writer, &suggestions)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use chrono::Duration;
    use insta::assert_snapshot;
    use lb_core::{BurnoutSample, StatusBand};

    use crate::Config;
    use crate::analysis::tests::day_start;

    fn high_risk(hour: i64) -> BurnoutSample {
        BurnoutSample {
            timestamp: day_start(6) + Duration::hours(hour),
            idle_ratio: 0.9,
            distraction_ratio: 0.8,
            switch_rate: 0.3,
            mean_score: 0.2,
            burnout_index: 20.0,
            status_band: StatusBand::High,
        }
    }

    #[test]
    fn test_repeated_high_risk_suggests_action() {
        let mut db = Database::open_in_memory().unwrap();
        for hour in 0..4 {
            db.append_burnout_sample(&high_risk(hour)).unwrap();
        }
        let analyzer = Analyzer::new(Arc::new(Config::default()), Utc);
        let suggestions = analyzer
            .suggestions(&db, day_start(6) + Duration::hours(5))
            .unwrap();
        assert!(!suggestions.is_empty());

        let mut output = Vec::new();
        format_suggestions(&mut output, &suggestions).unwrap();
        let output = String::from_utf8(output).unwrap();
        for suggestion in &suggestions {
            assert!(output.contains(&format!("- {}\n", suggestion.message)));
        }
    }

    #[test]
    fn test_no_suggestions() {
        let mut output = Vec::new();
        format_suggestions(&mut output, &[]).unwrap();
        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        No suggestions right now.

        Hint: Suggestions build on 'lb burnout' assessments.
        ");
    }
}
