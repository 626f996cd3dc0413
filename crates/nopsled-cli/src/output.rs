//! Rendering sleds for files and terminals.

use serde::Deserialize;

/// Bytes per line in the source-code formats.
const LINE_BYTES: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// The bytes themselves
    Raw,
    /// One line of lowercase hex
    Hex,
    /// C string literal
    C,
    /// Python bytes literal
    Python,
}

pub fn render(sled: &[u8], format: OutputFormat) -> Vec<u8> {
    match format {
        OutputFormat::Raw => sled.to_vec(),
        OutputFormat::Hex => {
            let mut text: String = sled.iter().map(|b| format!("{b:02x}")).collect();
            text.push('\n');
            text.into_bytes()
        }
        OutputFormat::C => {
            let mut text = format!("unsigned char sled[{}] =\n", sled.len());
            if sled.is_empty() {
                text.push_str("\"\"");
            }
            let lines: Vec<String> = sled
                .chunks(LINE_BYTES)
                .map(|chunk| format!("\"{}\"", escaped(chunk)))
                .collect();
            text.push_str(&lines.join("\n"));
            text.push_str(";\n");
            text.into_bytes()
        }
        OutputFormat::Python => {
            let mut text = String::from("sled = b\"\"\n");
            for chunk in sled.chunks(LINE_BYTES) {
                text.push_str(&format!("sled += b\"{}\"\n", escaped(chunk)));
            }
            text.into_bytes()
        }
    }
}

fn escaped(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("\\x{b:02x}")).collect()
}
