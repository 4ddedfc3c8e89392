use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    let dest_path = Path::new(&out_dir).join("key_codes.rs");
    let mut f = File::create(&dest_path).unwrap();

    // Generate the KeyCode newtype wrapper
    writeln!(
        f,
        r#"
/// A raw key code as carried in the `code` field of an input frame.
///
/// The numeric values match Linux input-event-codes.h definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct KeyCode(pub u16);

impl KeyCode {{
    /// Get the raw numeric code value
    pub fn code(self) -> u16 {{
        self.0
    }}

    /// Get the name of this key in the built-in table
    pub fn name(self) -> &'static str {{
        key_name(self.0)
    }}
}}

impl From<u16> for KeyCode {{
    fn from(code: u16) -> Self {{
        KeyCode(code)
    }}
}}

impl From<KeyCode> for u16 {{
    fn from(key: KeyCode) -> Self {{
        key.0
    }}
}}

impl fmt::Display for KeyCode {{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {{
        write!(f, "{{}}", self.name())
    }}
}}
"#
    )
    .unwrap();

    println!("cargo:rerun-if-changed=build.rs");
}
