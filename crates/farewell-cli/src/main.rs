//! Farewell command-line tool.
//!
//! Offline counterpart of the browser client: generates shares and keys,
//! packs and opens messages, splits and recombines keys, and shows how a
//! WASM URL is rewritten under a deployment base path.
//!
//! # Usage
//!
//! ```bash
//! # Fresh off-chain share for a recipient
//! farewell random-share
//!
//! # Seal a message under a key, then open it again
//! farewell encrypt --key 0x000102030405060708090a0b0c0d0e0f "hello"
//! farewell decrypt --key 0x000102030405060708090a0b0c0d0e0f 0x...
//!
//! # Where does the SDK binary come from under /farewell?
//! farewell relocate --base-path /farewell https://example.org/tfhe_bg.wasm
//! ```

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use farewell_core::{BasePath, FarewellError, relocate::relocate_wasm_url};
use farewell_crypto::{
    CryptoError, Hex128, OsEntropy, PackedCiphertext, combine_shares, decrypt, encrypt,
    generate_key, integer_to_key, key_to_integer, random_hex128, split_key, split_key_with,
};
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// Farewell offline tooling
#[derive(Parser, Debug)]
#[command(name = "farewell")]
#[command(about = "Key, share and ciphertext tooling for the Farewell protocol")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a fresh random 128-bit share
    RandomShare,

    /// Print a fresh AES-128 key as a 128-bit integer
    Keygen,

    /// Encrypt a UTF-8 message and print the packed ciphertext
    Encrypt {
        /// Key as 128-bit hex
        #[arg(short, long)]
        key: Hex128,

        /// Message text
        plaintext: String,
    },

    /// Open a packed ciphertext and print the message
    Decrypt {
        /// Key as 128-bit hex
        #[arg(short, long)]
        key: Hex128,

        /// Packed ciphertext (`0x` + lowercase hex)
        packed: String,
    },

    /// Split a key into on-chain and off-chain shares
    Split {
        /// Key as 128-bit hex
        #[arg(short, long)]
        key: Hex128,

        /// Use this off-chain share instead of a random one
        #[arg(long)]
        offchain: Option<Hex128>,
    },

    /// XOR two shares back into a key
    Combine {
        /// First share
        a: Hex128,

        /// Second share
        b: Hex128,
    },

    /// Apply the WASM base-path rewrite to a URL
    Relocate {
        /// Deployment base path (defaults to `FAREWELL_BASE_PATH`)
        #[arg(long)]
        base_path: Option<String>,

        /// Page URL the request is made from (defaults to the target's origin)
        #[arg(long)]
        page: Option<Url>,

        /// Requested URL
        url: Url,
    },
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl CliError {
    /// Message for the terminal. Cryptographic failures stay generic.
    fn user_message(&self) -> String {
        match self {
            Self::Crypto(err) => FarewellError::from(err.clone()).user_message().to_string(),
        }
    }
}

fn run(command: Command) -> Result<String, CliError> {
    match command {
        Command::RandomShare => Ok(random_hex128(&OsEntropy)),
        Command::Keygen => {
            let key = generate_key(&OsEntropy);
            Ok(Hex128::new(key_to_integer(&key)).to_string())
        },
        Command::Encrypt { key, plaintext } => {
            let key = integer_to_key(key.value());
            Ok(encrypt(plaintext.as_bytes(), &key, &OsEntropy).to_hex())
        },
        Command::Decrypt { key, packed } => {
            let key = integer_to_key(key.value());
            let packed = PackedCiphertext::from_hex(&packed)?;
            let plaintext = decrypt(&packed, &key, None)?;
            Ok(plaintext.text_lossy())
        },
        Command::Split { key, offchain } => {
            let key = integer_to_key(key.value());
            let shares = match offchain {
                Some(offchain) => split_key_with(&key, offchain),
                None => split_key(&key, &OsEntropy),
            };
            if shares.is_degenerate() {
                tracing::warn!("zero share: the other share equals the key");
            }
            Ok(format!("onchain:  {}\noffchain: {}", shares.onchain, shares.offchain))
        },
        Command::Combine { a, b } => Ok(combine_shares(a, b).to_string()),
        Command::Relocate { base_path, page, url } => {
            let base = base_path.map_or_else(BasePath::from_env, |raw| BasePath::new(&raw));
            let page = page.unwrap_or_else(|| url.clone());
            match relocate_wasm_url(&url, &page, &base) {
                Some(relocated) => {
                    tracing::info!(from = %url, to = %relocated, "relocated");
                    Ok(relocated.to_string())
                },
                None => Ok(url.to_string()),
            }
        },
    }
}

#[allow(clippy::print_stdout)]
fn emit(output: &str) {
    println!("{output}");
}

#[allow(clippy::print_stderr)]
fn report(err: &CliError) {
    eprintln!("error: {}", err.user_message());
}

fn main() -> ExitCode {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(args.command) {
        Ok(output) => {
            emit(&output);
            ExitCode::SUCCESS
        },
        Err(err) => {
            tracing::debug!(error = %err, "command failed");
            report(&err);
            ExitCode::FAILURE
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0x000102030405060708090a0b0c0d0e0f";

    fn key() -> Hex128 {
        KEY.parse().unwrap()
    }

    #[test]
    fn encrypt_then_decrypt() {
        let packed = run(Command::Encrypt { key: key(), plaintext: "hello".to_string() }).unwrap();
        assert!(packed.starts_with("0x"));

        let text = run(Command::Decrypt { key: key(), packed }).unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn decrypt_with_wrong_key_is_generic() {
        let packed = run(Command::Encrypt { key: key(), plaintext: "hello".to_string() }).unwrap();

        let err = run(Command::Decrypt { key: Hex128::new(1), packed }).unwrap_err();
        assert_eq!(err.user_message(), "decryption failed");
    }

    #[test]
    fn decrypt_rejects_uppercase_hex() {
        let err = run(Command::Decrypt { key: key(), packed: "0xABCD".to_string() }).unwrap_err();
        assert_eq!(err.user_message(), "invalid hex value");
    }

    #[test]
    fn split_then_combine() {
        let out = run(Command::Split { key: key(), offchain: None }).unwrap();
        let shares: Vec<Hex128> = out
            .lines()
            .map(|line| line.split_whitespace().last().unwrap().parse().unwrap())
            .collect();

        let combined = run(Command::Combine { a: shares[0], b: shares[1] }).unwrap();
        assert_eq!(combined, KEY);
    }

    #[test]
    fn split_with_given_share() {
        let offchain = Hex128::new(0xFF);
        let out = run(Command::Split { key: key(), offchain: Some(offchain) }).unwrap();
        assert!(out.ends_with(&offchain.to_string()));
    }

    #[test]
    fn random_share_is_canonical() {
        let share = run(Command::RandomShare).unwrap();
        assert_eq!(share.len(), 34);
        assert!(share.parse::<Hex128>().is_ok());
    }

    #[test]
    fn keygen_is_canonical() {
        let key = run(Command::Keygen).unwrap();
        assert!(key.parse::<Hex128>().is_ok());
    }

    #[test]
    fn relocate_under_base_path() {
        let out = run(Command::Relocate {
            base_path: Some("farewell/".to_string()),
            page: None,
            url: Url::parse("https://example.org/tfhe_bg.wasm?v=1").unwrap(),
        })
        .unwrap();
        assert_eq!(out, "https://example.org/farewell/tfhe_bg.wasm?v=1");
    }

    #[test]
    fn relocate_cross_origin_is_unchanged() {
        let out = run(Command::Relocate {
            base_path: Some("/farewell".to_string()),
            page: Some(Url::parse("https://example.org/farewell/").unwrap()),
            url: Url::parse("https://cdn.example.net/tfhe_bg.wasm").unwrap(),
        })
        .unwrap();
        assert_eq!(out, "https://cdn.example.net/tfhe_bg.wasm");
    }

    #[test]
    fn args_parse_hex_options() {
        let args = Args::try_parse_from(["farewell", "combine", "0x01", "0X02"]).unwrap();
        let Command::Combine { a, b } = args.command else {
            panic!("expected combine");
        };
        assert_eq!((a.value(), b.value()), (1, 2));

        assert!(Args::try_parse_from(["farewell", "combine", "0xZZ", "0x01"]).is_err());
    }
}
