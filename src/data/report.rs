/// One `##`-delimited section of the security report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSection {
    /// Heading text with the `## ` prefix removed
    pub title: String,
    /// Everything up to the next second-level heading
    pub body: String,
}

/// A parsed security report: the introduction block plus its sections.
///
/// Rebuilt from the raw text on every load; nothing here is cached.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReportDocument {
    /// Text between the document title and the first section heading
    pub introduction: String,
    pub sections: Vec<ReportSection>,
}

impl ReportDocument {
    /// Splits `text` on second-level headings, dropping the top-level
    /// `# ` title line if one leads the document.
    pub fn parse(text: &str) -> Self {
        let mut document = ReportDocument::default();
        let mut intro_lines: Vec<&str> = Vec::new();
        let mut current: Option<(String, Vec<&str>)> = None;
        let mut seen_content = false;

        for line in text.lines() {
            // Only a title leading the document is stripped; an h1 later in
            // the introduction belongs to the body.
            if !seen_content && line.starts_with("# ") {
                seen_content = true;
                continue;
            }
            seen_content = seen_content || !line.trim().is_empty();
            if let Some(heading) = line.strip_prefix("## ") {
                if let Some((title, body)) = current.take() {
                    document.sections.push(ReportSection {
                        title,
                        body: body.join("\n").trim().to_string(),
                    });
                }
                current = Some((heading.trim().to_string(), Vec::new()));
                continue;
            }
            match &mut current {
                Some((_, body)) => body.push(line),
                None => intro_lines.push(line),
            }
        }

        if let Some((title, body)) = current {
            document.sections.push(ReportSection {
                title,
                body: body.join("\n").trim().to_string(),
            });
        }
        document.introduction = intro_lines.join("\n").trim().to_string();
        document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# Security Scan Report\n\
        Target: /srv/dashboard\n\
        \n\
        ## 1. Dependency Audit\n\
        ```json\n\
        {}\n\
        ```\n\
        \n\
        ## 2. Code Safety\n\
        - [WARNING] Line 3: Possible Password found\n";

    #[test]
    fn splits_title_intro_and_sections() {
        let document = ReportDocument::parse(SAMPLE);
        assert_eq!(document.introduction, "Target: /srv/dashboard");
        assert_eq!(document.sections.len(), 2);
        assert_eq!(document.sections[0].title, "1. Dependency Audit");
        assert_eq!(document.sections[0].body, "```json\n{}\n```");
        assert_eq!(document.sections[1].title, "2. Code Safety");
        assert_eq!(
            document.sections[1].body,
            "- [WARNING] Line 3: Possible Password found"
        );
    }

    #[test]
    fn document_without_sections_is_all_introduction() {
        let document = ReportDocument::parse("# Title\njust text\nmore text");
        assert_eq!(document.introduction, "just text\nmore text");
        assert!(document.sections.is_empty());
    }

    #[test]
    fn heading_after_intro_text_is_kept() {
        let document = ReportDocument::parse("intro line\n# kept heading\n## Sec\nbody");
        assert_eq!(document.introduction, "intro line\n# kept heading");
        assert_eq!(document.sections[0].title, "Sec");
    }

    #[test]
    fn leading_blank_lines_do_not_protect_the_title() {
        let document = ReportDocument::parse("\n\n# Title\nintro");
        assert_eq!(document.introduction, "intro");
    }

    #[test]
    fn parse_is_idempotent_over_same_input() {
        assert_eq!(ReportDocument::parse(SAMPLE), ReportDocument::parse(SAMPLE));
    }
}
