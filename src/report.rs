use crate::budget::{BudgetRequest, BudgetResult, TokenBudgetPlanner};
use crate::config::{BudgetDefaults, BudgetOverrides};
use crate::error::{Result, ToolkitError};
use crate::text::{self, TextStats, TokenCounter};
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Word/token counts for one file together with its budget plan.
#[derive(Debug, Clone)]
pub struct CountReport {
    pub source: PathBuf,
    pub generated_at: DateTime<Local>,
    pub stats: TextStats,
    pub request: BudgetRequest,
    pub result: BudgetResult,
}

impl CountReport {
    pub fn new(
        source: impl Into<PathBuf>,
        stats: TextStats,
        request: BudgetRequest,
        result: BudgetResult,
    ) -> Self {
        Self {
            source: source.into(),
            generated_at: Local::now(),
            stats,
            request,
            result,
        }
    }

    /// `count_<stem>_<YYYYmmdd_HHMMSS>.txt`
    pub fn file_name(&self) -> String {
        let stem = self
            .source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("input");
        format!(
            "count_{}_{}.txt",
            stem,
            self.generated_at.format("%Y%m%d_%H%M%S")
        )
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(out, "Token and Word Count Report");
        let _ = writeln!(out, "=========================");
        let _ = writeln!(out);
        let _ = writeln!(out, "Analysis of file: {}", self.source.display());
        let _ = writeln!(
            out,
            "Generated on: {}",
            self.generated_at.format("%Y-%m-%d %H:%M:%S")
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "Word count: {}", self.stats.word_count);
        let _ = writeln!(out, "Token count: {}", self.stats.prompt_tokens);
        let _ = writeln!(out, "Words per token ratio: {:.2}", self.stats.words_per_token);
        let _ = writeln!(out);
        let _ = writeln!(out, "Context window: {} tokens", self.request.context_window);
        let _ = writeln!(out, "Available tokens: {} tokens", self.result.available_tokens);
        let _ = writeln!(out, "Thinking budget: {} tokens", self.result.thinking_budget);
        let _ = writeln!(
            out,
            "Desired output tokens: {} tokens",
            self.request.desired_output_tokens
        );
        let _ = writeln!(out, "Max output tokens: {} tokens", self.result.max_tokens);
        let _ = writeln!(
            out,
            "Thinking budget sufficient: {}",
            if self.result.sufficient { "yes" } else { "no" }
        );
        out
    }

    /// Write the report into `save_dir`, returning the absolute path written.
    pub fn write(&self, save_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(save_dir)?;
        let path = save_dir.join(self.file_name());
        fs::write(&path, self.render())?;
        let path = fs::canonicalize(&path)?;
        tracing::info!(path = %path.display(), "report saved");
        Ok(path)
    }
}

/// Record created files, one path per line, for the launcher that started us.
pub fn write_output_tracking(tracking_file: &Path, created: &[PathBuf]) -> Result<()> {
    let mut body = String::new();
    for path in created {
        body.push_str(&path.display().to_string());
        body.push('\n');
    }
    fs::write(tracking_file, body)?;
    tracing::debug!(
        tracking_file = %tracking_file.display(),
        files = created.len(),
        "wrote output tracking file"
    );
    Ok(())
}

/// Everything `count` measured and decided for one file.
#[derive(Debug, Clone)]
pub struct CountOutcome {
    pub stats: TextStats,
    pub request: BudgetRequest,
    pub result: BudgetResult,
    /// Absolute path of the written report; `None` when the budget was
    /// insufficient and nothing was written.
    pub report_path: Option<PathBuf>,
}

/// Measure `text_file`, plan its budget and, only if the plan is sufficient,
/// write the report and the optional tracking file.
pub fn run_count(
    text_file: &Path,
    defaults: &BudgetDefaults,
    overrides: &BudgetOverrides,
    counter: &dyn TokenCounter,
    save_dir: &Path,
    output_tracking: Option<&Path>,
) -> Result<CountOutcome> {
    let content = text::read_text_file(text_file)?;
    let stats = TextStats::measure(&content, counter)?;
    let prompt_tokens = i64::try_from(stats.prompt_tokens).map_err(|_| {
        ToolkitError::InvalidArgument(format!("prompt_tokens {} exceeds i64", stats.prompt_tokens))
    })?;

    let request = defaults.resolve(overrides, prompt_tokens)?;
    let result = TokenBudgetPlanner::plan(&request)?;

    if !result.sufficient {
        tracing::debug!(path = %text_file.display(), "budget insufficient, no report written");
        return Ok(CountOutcome {
            stats,
            request,
            result,
            report_path: None,
        });
    }

    let report_path = CountReport::new(text_file, stats, request, result).write(save_dir)?;
    if let Some(tracking_file) = output_tracking {
        write_output_tracking(tracking_file, std::slice::from_ref(&report_path))?;
    }

    Ok(CountOutcome {
        stats,
        request,
        result,
        report_path: Some(report_path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::HeuristicCounter;
    use chrono::TimeZone;

    fn sample_report() -> CountReport {
        let request = BudgetRequest {
            context_window: 200_000,
            prompt_tokens: 50_000,
            max_output_tokens_cap: 128_000,
            desired_output_tokens: 12_000,
            requested_thinking_tokens: 32_000,
            thinking_hard_cap: 32_000,
        };
        let result = TokenBudgetPlanner::plan(&request).unwrap();
        let stats = TextStats {
            word_count: 37_500,
            prompt_tokens: 50_000,
            words_per_token: 0.75,
        };
        let mut report = CountReport::new("drafts/chapter 01.txt", stats, request, result);
        report.generated_at = Local.with_ymd_and_hms(2025, 3, 4, 9, 5, 7).unwrap();
        report
    }

    #[test]
    fn test_file_name() {
        assert_eq!(sample_report().file_name(), "count_chapter 01_20250304_090507.txt");
    }

    #[test]
    fn test_render_contains_plan() {
        let text = sample_report().render();
        assert!(text.starts_with("Token and Word Count Report\n"));
        assert!(text.contains("Generated on: 2025-03-04 09:05:07"));
        assert!(text.contains("Word count: 37500"));
        assert!(text.contains("Words per token ratio: 0.75"));
        assert!(text.contains("Available tokens: 150000 tokens"));
        assert!(text.contains("Thinking budget: 32000 tokens"));
        assert!(text.contains("Max output tokens: 128000 tokens"));
        assert!(text.contains("Thinking budget sufficient: yes"));
    }

    #[test]
    fn test_write_creates_save_dir() {
        let dir = tempfile::tempdir().unwrap();
        let save_dir = dir.path().join("reports").join("counts");

        let path = sample_report().write(&save_dir).unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("count_chapter 01_20250304_090507.txt"));
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("Token count: 50000"));
    }

    fn manuscript(dir: &Path, bytes: usize) -> PathBuf {
        let path = dir.join("manuscript.txt");
        let sentence = "The lamp guttered out. ";
        let body = sentence.repeat(bytes / sentence.len() + 1);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_run_count_insufficient_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        // ~4000 bytes -> ~1000 tokens, far more than the window allows
        let text_file = manuscript(dir.path(), 4_000);
        let save_dir = dir.path().join("reports");
        let tracking = dir.path().join("tracking.txt");
        let overrides = BudgetOverrides {
            context_window: Some(500),
            ..BudgetOverrides::default()
        };

        let outcome = run_count(
            &text_file,
            &BudgetDefaults::default(),
            &overrides,
            &HeuristicCounter,
            &save_dir,
            Some(&tracking),
        )
        .unwrap();

        assert!(!outcome.result.sufficient);
        assert!(outcome.result.available_tokens < 0);
        assert!(outcome.report_path.is_none());
        assert!(!save_dir.exists());
        assert!(!tracking.exists());
    }

    #[test]
    fn test_run_count_writes_report_and_tracking() {
        let dir = tempfile::tempdir().unwrap();
        let text_file = manuscript(dir.path(), 4_000);
        let save_dir = dir.path().join("reports");
        let tracking = dir.path().join("tracking.txt");

        let outcome = run_count(
            &text_file,
            &BudgetDefaults::default(),
            &BudgetOverrides::default(),
            &HeuristicCounter,
            &save_dir,
            Some(&tracking),
        )
        .unwrap();

        assert!(outcome.result.sufficient);
        assert_eq!(outcome.request.prompt_tokens, outcome.stats.prompt_tokens as i64);
        let report_path = outcome.report_path.unwrap();
        assert!(report_path.is_absolute());
        assert!(report_path.exists());
        assert_eq!(
            fs::read_to_string(&tracking).unwrap(),
            format!("{}\n", report_path.display())
        );
    }

    #[test]
    fn test_run_count_resolution_order() {
        let dir = tempfile::tempdir().unwrap();
        let text_file = manuscript(dir.path(), 400);
        let save_dir = dir.path().join("reports");
        let defaults = BudgetDefaults {
            context_window: Some(150_000),
            desired_output_tokens: 8_000,
            ..BudgetDefaults::default()
        };

        // configuration over catalogue
        let outcome = run_count(
            &text_file,
            &defaults,
            &BudgetOverrides::default(),
            &HeuristicCounter,
            &save_dir,
            None,
        )
        .unwrap();
        assert_eq!(outcome.request.context_window, 150_000);
        assert_eq!(outcome.request.max_output_tokens_cap, 128_000);
        assert_eq!(outcome.request.desired_output_tokens, 8_000);

        // flag over configuration
        let overrides = BudgetOverrides {
            context_window: Some(180_000),
            ..BudgetOverrides::default()
        };
        let outcome = run_count(
            &text_file,
            &defaults,
            &overrides,
            &HeuristicCounter,
            &save_dir,
            None,
        )
        .unwrap();
        assert_eq!(outcome.request.context_window, 180_000);
    }

    #[test]
    fn test_run_count_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_count(
            &dir.path().join("absent.txt"),
            &BudgetDefaults::default(),
            &BudgetOverrides::default(),
            &HeuristicCounter,
            dir.path(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ToolkitError::InputNotFound { .. }));
    }

    #[test]
    fn test_write_output_tracking() {
        let dir = tempfile::tempdir().unwrap();
        let tracking = dir.path().join("tracking.txt");
        fs::write(&tracking, "stale\n").unwrap();

        let files = vec![PathBuf::from("/tmp/a.txt"), PathBuf::from("/tmp/b.txt")];
        write_output_tracking(&tracking, &files).unwrap();

        assert_eq!(fs::read_to_string(&tracking).unwrap(), "/tmp/a.txt\n/tmp/b.txt\n");
    }
}
