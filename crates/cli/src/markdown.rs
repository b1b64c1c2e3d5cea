//! Lightweight markdown styling for terminal output: headings and bold
//! spans get ANSI emphasis, everything else passes through untouched.

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

pub fn render(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            out.push('\n');
        }

        let trimmed = line.trim_start();
        if trimmed.starts_with('#') {
            let heading = trimmed.trim_start_matches('#').trim_start();
            out.push_str(BOLD);
            out.push_str(heading);
            out.push_str(RESET);
        } else {
            out.push_str(&style_bold_spans(line));
        }
    }

    if text.ends_with('\n') {
        out.push('\n');
    }
    out
}

fn style_bold_spans(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    let mut open = false;

    while let Some(pos) = rest.find("**") {
        out.push_str(&rest[..pos]);
        out.push_str(if open { RESET } else { BOLD });
        open = !open;
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);

    // Unbalanced marker: close the style so it does not bleed.
    if open {
        out.push_str(RESET);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_unchanged() {
        assert_eq!(render("nothing special"), "nothing special");
    }

    #[test]
    fn headings_are_emphasized() {
        assert_eq!(render("## Setup"), format!("{BOLD}Setup{RESET}"));
    }

    #[test]
    fn bold_spans_are_styled() {
        assert_eq!(
            render("a **big** deal"),
            format!("a {BOLD}big{RESET} deal")
        );
    }

    #[test]
    fn unbalanced_markers_do_not_bleed() {
        assert_eq!(render("oops **bold"), format!("oops {BOLD}bold{RESET}"));
    }
}
