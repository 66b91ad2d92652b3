use crate::error::{self, Result};
use rand::prelude::*;
use snafu::prelude::*;
use std::path::Path;

/// Length of both the access key and the secret key
pub const KEY_LENGTH: usize = 10;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Credentials for the minio servers, generated fresh for every run
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub access_key: String,
    pub secret_key: String,
}

impl KeyPair {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();

        Self {
            access_key: random_letters(&mut rng, KEY_LENGTH),
            secret_key: random_letters(&mut rng, KEY_LENGTH),
        }
    }

    /// The key pair file format read by the plugin tests: access key on the first line, secret
    /// key on the second
    pub fn to_file_contents(&self) -> String {
        format!("{}\n{}\n", self.access_key, self.secret_key)
    }

    pub async fn write_to(&self, path: &Path) -> Result<()> {
        tokio::fs::write(path, self.to_file_contents())
            .await
            .context(error::WriteKeyPairSnafu {
                path: path.to_owned(),
            })
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

fn random_letters(rng: &mut impl Rng, len: usize) -> String {
    (0..len)
        .map(|_| LETTERS[rng.gen_range(0..LETTERS.len())] as char)
        .collect()
}
