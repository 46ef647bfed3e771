// ============================================================
// Layer 4 — Text Preprocessor
// ============================================================
// Cleans one sentence before it is written into a fold file.
//
// Fold files are comma separated with no quoting, so a raw ASCII
// comma inside a sentence would shift every column after it.
// Sentences also arrive with the usual copy-paste debris:
//   - Non-breaking / zero-width spaces, byte order marks
//   - Tabs, carriage returns and stray newlines
//   - Runs of spaces
//
// Cleaning steps (applied in order):
//   1. ASCII comma → full-width comma "，"
//   2. Whitespace variants and control characters → plain space
//   3. Collapse runs of spaces, trim both ends

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Clean a single sentence so it fits in one CSV cell.
    pub fn clean(&self, text: &str) -> String {
        let mapped = text.chars().map(|c| match c {
            ',' => '，',
            '\t' | '\r' | '\n' => ' ',
            '\u{00A0}' | '\u{200B}' | '\u{FEFF}' | '\u{3000}' => ' ',
            c if c.is_control() => ' ',
            c => c,
        });

        let mut out        = String::with_capacity(text.len());
        let mut last_space = false;
        for c in mapped {
            if c == ' ' {
                if !last_space {
                    out.push(' ');
                }
                last_space = true;
            } else {
                out.push(c);
                last_space = false;
            }
        }

        out.trim().to_string()
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}
