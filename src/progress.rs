use std::{
    fmt::Display,
    time::{Duration, Instant},
};

use tracing::info;

#[derive(Debug)]
pub struct FormattedDuration(pub Duration);

impl Display for FormattedDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut t = self.0.as_secs();
        let seconds = t % 60;
        t /= 60;
        let minutes = t % 60;
        t /= 60;
        let hours = t % 24;
        t /= 24;
        if t > 0 {
            let days = t;
            write!(f, "{days}d {hours:02}:{minutes:02}:{seconds:02}")
        } else {
            write!(f, "{hours:02}:{minutes:02}:{seconds:02}")
        }
    }
}

/// Rows attempted so far for one table, logged at every batch boundary.
pub struct ImportProgress {
    table: String,
    total: u64,
    imported: u64,
    errors: u64,
    started: Instant,
}

impl ImportProgress {
    pub fn new(table: &str, total: u64) -> Self {
        return Self {
            table: table.to_string(),
            total,
            imported: 0,
            errors: 0,
            started: Instant::now(),
        };
    }

    pub fn update(&mut self, imported: u64, errors: u64) {
        self.imported = imported;
        self.errors = errors;
    }

    pub fn processed(&self) -> u64 {
        return self.imported + self.errors;
    }

    pub fn log(&self) {
        info!("Importing table {} {}", self.table, self);
    }

    fn render(&self, elapsed: Duration) -> String {
        let current = self.processed();
        let secs = elapsed.as_secs_f64();
        let per_sec = if secs > 0.0 {
            (current as f64 / secs) as u64
        } else {
            current
        };
        let mut text = format!("[{}] Processed: ", FormattedDuration(elapsed));
        if self.total > 0 {
            let percent = current * 100 / self.total;
            let percent_remainder = (current * 100 % self.total) * 10 / self.total;
            text.push_str(&format!(
                "{percent}.{percent_remainder}% ({current}/{}) ",
                self.total
            ));
        } else {
            text.push_str(&format!("{current} "));
        }
        text.push_str(&format!(
            "Imported: {} Errors: {} Rows per sec: {per_sec}",
            self.imported, self.errors
        ));
        if per_sec > 0 && self.total >= current {
            let eta = FormattedDuration(Duration::from_secs((self.total - current) / per_sec));
            text.push_str(&format!(" ETA: {eta}"));
        }
        return text;
    }
}

impl Display for ImportProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return f.write_str(&self.render(self.started.elapsed()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "00:00:00")]
    #[case(59, "00:00:59")]
    #[case(3_661, "01:01:01")]
    #[case(90_061, "1d 01:01:01")]
    fn test_formatted_duration(#[case] secs: u64, #[case] expected: &str) {
        assert_eq!(FormattedDuration(Duration::from_secs(secs)).to_string(), expected);
    }

    #[test]
    fn test_render_with_eta() {
        let mut progress = ImportProgress::new("ak_animes", 1000);
        progress.update(240, 10);
        assert_eq!(
            progress.render(Duration::from_secs(5)),
            "[00:00:05] Processed: 25.0% (250/1000) Imported: 240 Errors: 10 Rows per sec: 50 ETA: 00:00:15"
        );
    }

    #[test]
    fn test_render_without_elapsed_time() {
        let mut progress = ImportProgress::new("ak_tags", 3);
        progress.update(1, 0);
        assert_eq!(
            progress.render(Duration::ZERO),
            "[00:00:00] Processed: 33.3% (1/3) Imported: 1 Errors: 0 Rows per sec: 1 ETA: 00:00:02"
        );
    }

    #[test]
    fn test_render_empty_total() {
        let progress = ImportProgress::new("ak_tags", 0);
        assert_eq!(
            progress.render(Duration::from_secs(1)),
            "[00:00:01] Processed: 0 Imported: 0 Errors: 0 Rows per sec: 0"
        );
    }
}
