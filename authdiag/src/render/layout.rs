use super::escape_html;

const THEME: &str = r#"
body { margin: 0; font-family: Roboto, Helvetica, Arial, sans-serif; background: #fafafa; color: rgba(0, 0, 0, 0.87); }
header.appbar { background: #3f51b5; color: #fff; padding: 16px 24px; box-shadow: 0 2px 4px rgba(0, 0, 0, 0.2); }
header.appbar h1 { margin: 0; font-size: 1.25rem; font-weight: 500; }
.paper { background: #fff; border-radius: 4px; box-shadow: 0 1px 3px rgba(0, 0, 0, 0.2); padding: 16px 24px; margin: 16px 64px; }
.title { margin: 0 0 8px; font-size: 1.25rem; font-weight: 500; }
.button { display: inline-block; margin-right: 8px; padding: 6px 16px; border: none; border-radius: 4px; background: #e0e0e0; color: rgba(0, 0, 0, 0.87); font: inherit; text-decoration: none; cursor: pointer; box-shadow: 0 1px 2px rgba(0, 0, 0, 0.2); }
.button.primary { background: #3f51b5; color: #fff; }
form.inline { display: inline; margin: 0; }
pre.json { margin: 0; padding: 8px; background: #f0f0f0; overflow-x: auto; }
.hl-key { color: #a31515; }
.hl-string { color: #0451a5; }
.hl-number { color: #098658; }
.hl-literal { color: #0000ff; }
.hl-punct { color: #333; }
"#;

/// Root layout: theme, application bar and the composed views.
#[derive(Debug, Clone)]
pub struct Layout<'a> {
    pub title: &'a str,
    pub sections: Vec<String>,
}

impl<'a> Layout<'a> {
    pub fn new(title: &'a str) -> Self {
        Self {
            title,
            sections: Vec::new(),
        }
    }

    pub fn section(mut self, html: String) -> Self {
        self.sections.push(html);
        self
    }

    pub fn render(&self) -> String {
        let title = escape_html(self.title);
        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>{theme}</style>
</head>
<body>
<header class="appbar"><h1>{title}</h1></header>
<main>
{sections}
</main>
</body>
</html>
"#,
            title = title,
            theme = THEME,
            sections = self.sections.join("\n"),
        )
    }
}
