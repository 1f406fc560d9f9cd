//! Plan digests.

use sha2::{Digest, Sha256};

/// Compute a deterministic digest of an ordered list of commands.
///
/// Commands are NUL-separated so that `["ab", "c"]` and `["a", "bc"]` differ.
pub fn commands_digest<I, S>(commands: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut hasher = Sha256::new();
    for command in commands {
        hasher.update(command.as_ref().as_bytes());
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}
