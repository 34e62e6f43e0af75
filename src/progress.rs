/// One progress report scraped from a downloader output line
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// Completion percentage (0.0 to 100.0)
    pub percent: f32,
    /// Transfer speed as printed, e.g. `1.23MiB/s`
    pub speed: Option<String>,
    /// Remaining time as printed, e.g. `00:07`
    pub eta: Option<String>,
}

/// Reads the percentage in front of the first `%` of a line.
///
/// Accepts both bare reports (`45.2% of 10MiB`) and the tagged form the
/// downloader prints with `--newline` (`[download]  45.2% of ...`). Anything
/// that does not parse yields `None`; the output format is not stable, so
/// this is best effort.
pub fn parse_progress_from_line(line: &str) -> Option<f32> {
    let (before, _) = line.split_once('%')?;
    if before.ends_with(char::is_whitespace) {
        return None;
    }
    let number = before.split_whitespace().next_back()?;
    let value = number.parse::<f32>().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value.clamp(0.0, 100.0))
}

/// Percentage plus whatever speed and ETA the line carries.
pub fn parse_progress_update(line: &str) -> Option<ProgressUpdate> {
    let percent = parse_progress_from_line(line)?;
    Some(ProgressUpdate {
        percent,
        speed: token_after(line, " at "),
        eta: token_after(line, "ETA "),
    })
}

fn token_after(line: &str, marker: &str) -> Option<String> {
    let (_, rest) = line.split_once(marker)?;
    let token = rest.split_whitespace().next()?;
    if token.starts_with("Unknown") {
        return None;
    }
    Some(token.to_string())
}
