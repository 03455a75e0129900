use std::fs;
use std::io;
use std::path::Path;

struct Entry {
    name: String,
    is_dir: bool,
    is_symlink: bool,
}

/// Renders the default HTML listing for `dir`, shown under `url_path`.
pub fn render(dir: &Path, url_path: &str) -> io::Result<String> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_symlink = entry.file_type()?.is_symlink();
        // Follows links, so a link to a directory still lists with a slash.
        let is_dir = fs::metadata(entry.path())
            .map(|meta| meta.is_dir())
            .unwrap_or(false);

        entries.push(Entry {
            name,
            is_dir,
            is_symlink,
        });
    }
    entries.sort_by_key(|entry| entry.name.to_lowercase());

    let title = format!("Directory listing for {}", escape_html(url_path));
    let mut page = String::new();
    page.push_str("<!DOCTYPE HTML>\n<html lang=\"en\">\n<head>\n");
    page.push_str("<meta charset=\"utf-8\">\n");
    page.push_str(&format!("<title>{}</title>\n</head>\n<body>\n", title));
    page.push_str(&format!("<h1>{}</h1>\n<hr>\n<ul>\n", title));

    for entry in &entries {
        let mut display = entry.name.clone();
        let mut href = urlencoding::encode(&entry.name).into_owned();
        if entry.is_dir {
            display.push('/');
            href.push('/');
        }
        if entry.is_symlink {
            display = format!("{}@", entry.name);
        }

        page.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            href,
            escape_html(&display)
        ));
    }

    page.push_str("</ul>\n<hr>\n</body>\n</html>\n");
    Ok(page)
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}
