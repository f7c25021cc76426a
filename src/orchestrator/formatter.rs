//! Best-effort cleanup of assistant replies before they are rendered as
//! markdown. Models often return code without fences; the heuristics here
//! wrap runs of code-looking lines and tag them with a guessed language.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static INLINE_LANGUAGE_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)(^|[^`\w])(java|javascript|python|csharp|typescript|cpp|c\+\+|go|rust|sql|html|css)[ \t]+((?:import|public|class|function|def|var|let|const|#include|<\?php).+?)(\n\n|\n[A-Z]|$)",
    )
    .expect("valid inline code pattern")
});

static CODE_LINE_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(import|package|public|private|class|interface|function|def|var|let|const|#include|using|namespace|\s*\{|\s*\}|\s*if\s*\(|\s*for\s*\(|\s*while\s*\()",
    )
    .expect("valid code line pattern")
});

static STATEMENT_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[;}]{1,2}\s*$").expect("valid statement end pattern"));

static INDENTED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s{4,}").expect("valid indent pattern"));

static CALL_OR_ASSIGN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[a-zA-Z_][a-zA-Z0-9_]*\s*[=(]").expect("valid assignment pattern")
});

static EXTRA_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid newline pattern"));

static FENCE_OPEN_SPACING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(\w+)\s*\n").expect("valid fence pattern"));

static FENCE_LEADING_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*```").expect("valid fence pattern"));

static LANGUAGE_HINTS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("java", r"\b(import|public|class|private|static|void)\b"),
        ("javascript", r"\b(function|const|let|var)\b|=>"),
        ("python", r"\b(def|import|class)\b|if __name__"),
        ("csharp", r"\b(using|namespace|public|private|static|void)\b"),
        ("typescript", r"\b(interface|type|const|let|function)\b"),
        ("cpp", r"#include|\bint main\b|\bstd::"),
        ("go", r"\b(package|func|import|var)\b"),
        ("rust", r"\b(fn|let|mut|struct|impl)\b"),
        ("sql", r"(?i)\b(SELECT|FROM|WHERE|INSERT|UPDATE|DELETE)\b"),
        ("html", r"<[^>]+>"),
    ]
    .into_iter()
    .map(|(lang, pattern)| (lang, Regex::new(pattern).expect("valid language hint")))
    .collect()
});

/// Guesses a fence language for one line of code. First match wins, so
/// ambiguous lines lean towards Java.
pub fn detect_language(code: &str) -> &'static str {
    LANGUAGE_HINTS
        .iter()
        .find(|(_, pattern)| pattern.is_match(code))
        .map(|(lang, _)| *lang)
        .unwrap_or("text")
}

fn is_code_line(line: &str) -> bool {
    let trimmed = line.trim();
    CODE_LINE_START.is_match(trimmed)
        || STATEMENT_END.is_match(trimmed)
        || INDENTED.is_match(line)
        || (CALL_OR_ASSIGN.is_match(trimmed) && trimmed.len() > 20)
}

fn flush(buffer: &mut Vec<&str>, language: &str, out: &mut Vec<String>) {
    if buffer.len() > 1 {
        out.push(format!("```{}", language));
        out.extend(buffer.iter().map(|l| l.to_string()));
        out.push("```".to_string());
    } else {
        out.extend(buffer.iter().map(|l| l.to_string()));
    }
    buffer.clear();
}

/// Normalizes a reply for markdown rendering.
///
/// Text already inside fences passes through untouched. Outside fences,
/// two or more consecutive code-like lines become a fenced block, a lone
/// code-like line stays inline, and runs of blank lines collapse.
pub fn preprocess_message_content(content: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let cleaned = INLINE_LANGUAGE_CODE.replace_all(trimmed, |caps: &Captures| {
        format!(
            "{}\n```{}\n{}\n```\n{}",
            &caps[1],
            caps[2].to_lowercase(),
            caps[3].trim(),
            &caps[4]
        )
    });

    let mut out: Vec<String> = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();
    let mut language = "text";
    let mut in_fence = false;

    for line in cleaned.split('\n') {
        if line.trim().starts_with("```") {
            flush(&mut buffer, language, &mut out);
            out.push(line.to_string());
            in_fence = !in_fence;
            continue;
        }

        if in_fence {
            out.push(line.to_string());
            continue;
        }

        if is_code_line(line) {
            if buffer.is_empty() {
                language = detect_language(line.trim());
            }
            buffer.push(line);
        } else {
            flush(&mut buffer, language, &mut out);
            out.push(line.to_string());
        }
    }
    flush(&mut buffer, language, &mut out);

    let joined = out.join("\n");
    let joined = EXTRA_NEWLINES.replace_all(&joined, "\n\n");
    let joined = FENCE_OPEN_SPACING.replace_all(&joined, "```$1\n");
    let joined = FENCE_LEADING_SPACE.replace_all(&joined, "\n```");

    joined.trim().to_string()
}
