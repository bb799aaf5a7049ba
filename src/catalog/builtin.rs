//! Bundled signatures for common desktop password managers.

use super::Signature;

/// Built-in signatures, in report order.
#[must_use]
pub fn builtin_signatures() -> Vec<Signature> {
    vec![
        Signature::new("LastPass")
            .with_paths(&[
                r"C:\Program Files (x86)\LastPass",
                r"C:\ProgramData\LastPass",
            ])
            .with_pipes(&["LASTPASS_"])
            .with_notes("desktop client holds a LASTPASS_* pipe while running"),
        Signature::new("Dashlane").with_paths(&[
            r"C:\Program Files (x86)\Dashlane",
            r"C:\ProgramData\Dashlane",
        ]),
        Signature::new("1Password")
            .with_paths(&[
                r"C:\Users\*\AppData\*\1Password",
                r"C:\Program Files\1Password",
                r"C:\Program Files (x86)\1Password",
            ])
            .with_notes("per-user installs live under AppData\\Local or AppData\\Roaming"),
        Signature::new("Bitwarden").with_paths(&[
            r"C:\Program Files\Bitwarden",
            r"C:\Users\*\AppData\Local\Bitwarden",
        ]),
        Signature::new("KeePass").with_paths(&[
            r"C:\Program Files\KeePass*",
            r"C:\Program Files (x86)\KeePass*",
        ]),
        Signature::new("EnPass")
            .with_paths(&[r"C:\Program Files\Enpass", r"C:\Program Files (x86)\Enpass"])
            .with_pipes(&["-enpass-"]),
    ]
}
