use crate::error::{Result, StatsError};
use crate::models::MetricSample;
use crate::services::history_store::format_row;
use crate::utils::format_thousands;
use std::fs;
use std::path::Path;

/// Literal substitution of the `{{...}}` placeholders. Unknown placeholders are left as-is.
pub fn render(template: &str, sample: &MetricSample) -> String {
    let latest_stats = format_row(sample).replace(',', "|");
    let replacements = [
        ("{{last_updated}}", sample.formatted_timestamp()),
        ("{{subscribers}}", format_thousands(sample.subscribers)),
        ("{{views}}", format_thousands(sample.views)),
        ("{{videos}}", sample.videos.to_string()),
        ("{{playlists}}", sample.playlists.to_string()),
        ("{{latest_stats}}", latest_stats),
    ];

    replacements
        .iter()
        .fold(template.to_string(), |doc, (token, value)| {
            doc.replace(token, value)
        })
}

/// Renders `template_path` into `output_path`, replacing the output entirely.
pub fn render_file(template_path: &Path, output_path: &Path, sample: &MetricSample) -> Result<()> {
    let template =
        fs::read_to_string(template_path).map_err(|e| StatsError::io(template_path, e))?;
    fs::write(output_path, render(&template, sample)).map_err(|e| StatsError::io(output_path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample() -> MetricSample {
        MetricSample {
            timestamp: NaiveDate::from_ymd_opt(2024, 2, 29)
                .unwrap()
                .and_hms_opt(23, 59, 1)
                .unwrap(),
            subscribers: 12345,
            views: 9876543,
            videos: 1234,
            playlists: 12,
        }
    }

    #[test]
    fn subscribers_use_thousands_separator() {
        assert_eq!(render("Subs: {{subscribers}}", &sample()), "Subs: 12,345");
    }

    #[test]
    fn all_placeholders() {
        let doc = render(
            "{{last_updated}} | {{subscribers}} | {{views}} | {{videos}} | {{playlists}}",
            &sample(),
        );
        assert_eq!(doc, "2024-02-29 23:59:01 | 12,345 | 9,876,543 | 1234 | 12");
    }

    #[test]
    fn latest_stats_row() {
        assert_eq!(
            render("{{latest_stats}}", &sample()),
            "2024-02-29 23:59:01|12345|9876543|1234|12"
        );
    }

    #[test]
    fn unknown_placeholders_are_untouched() {
        assert_eq!(
            render("{{likes}} and {{videos}} and {{videos}}", &sample()),
            "{{likes}} and 1234 and 1234"
        );
    }

    #[test]
    fn missing_template_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = render_file(
            &dir.path().join("missing.md"),
            &dir.path().join("README.md"),
            &sample(),
        )
        .unwrap_err();
        assert!(matches!(err, StatsError::Io { .. }));
        assert!(!dir.path().join("README.md").exists());
    }

    #[test]
    fn renders_file() {
        let dir = TempDir::new().unwrap();
        let template = dir.path().join("README.template.md");
        let output = dir.path().join("README.md");
        fs::write(&template, "# Stats\nViews: {{views}}\n").unwrap();
        fs::write(&output, "stale").unwrap();

        render_file(&template, &output, &sample()).unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), "# Stats\nViews: 9,876,543\n");
        // template is left intact for the next run
        assert!(fs::read_to_string(&template).unwrap().contains("{{views}}"));
    }
}
