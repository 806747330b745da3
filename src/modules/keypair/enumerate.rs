//! `keypair enum`: enumerate BIP44 derivation paths for a mnemonic
//!
//! Paths are produced for every combination of account and address index in the requested
//! ranges, using the path shape of the selected coin type.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;

use clap::{Args, FromArgMatches};
use log::debug;
use serde::Deserialize;
use thiserror::Error;

use crate::commands::handle::{ActionResult, CommandHandle, Invocation};

pub const ETHEREUM: u32 = 60;
pub const APTOS: u32 = 637;

/// Valid BIP39 mnemonic lengths
const MNEMONIC_WORDS: [usize; 5] = [12, 15, 18, 21, 24];

#[derive(Error, Debug)]
pub enum KeypairError {
    #[error("Either --file or --mnemonic is required")]
    MissingMnemonic,
    #[error("Invalid index range `{0}`: expected N or FROM-TO")]
    InvalidRange(String),
    #[error("Invalid coin type: {0}")]
    InvalidCoinType(u32),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Mnemonic has {0} words, expected 12, 15, 18, 21 or 24")]
    MnemonicLength(usize),
    #[error("Unable to read keypair file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to parse keypair file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Inclusive range of BIP44 indices, written as `N` or `FROM-TO`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    pub from: u32,
    pub to: u32,
}

impl IndexRange {
    pub fn iter(self) -> impl Iterator<Item = u32> {
        self.from..=self.to
    }
}

impl FromStr for IndexRange {
    type Err = KeypairError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || KeypairError::InvalidRange(value.to_string());
        let parse = |part: &str| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse::<u32>().map_err(|_| invalid())
        };
        let range = match value.split_once('-') {
            Some((from, to)) => IndexRange {
                from: parse(from)?,
                to: parse(to)?,
            },
            None => {
                let index = parse(value)?;
                IndexRange {
                    from: index,
                    to: index,
                }
            }
        };
        if range.from > range.to {
            return Err(invalid());
        }
        Ok(range)
    }
}

#[derive(Args, Debug)]
pub struct EnumArgs {
    /// The keypair file, a JSON document with a `mnemonic` field
    #[arg(long)]
    file: Option<String>,

    /// The mnemonic
    #[arg(long)]
    mnemonic: Option<String>,

    /// The coin type of the mnemonic, refer to BIP44
    #[arg(long, value_name = "60|637")]
    coin_type: u32,

    /// The account index of the mnemonic, refer to BIP44
    #[arg(long, value_name = "N|FROM-TO")]
    account_index: IndexRange,

    /// The address index of the mnemonic, refer to BIP44
    #[arg(long, value_name = "N|FROM-TO")]
    address_index: IndexRange,
}

#[derive(Deserialize)]
struct KeypairFile {
    mnemonic: String,
}

impl EnumArgs {
    fn resolve_mnemonic(&self) -> Result<String, KeypairError> {
        if let Some(file) = &self.file {
            read_mnemonic_file(Path::new(shellexpand::tilde(file).as_ref()))
        } else if let Some(mnemonic) = &self.mnemonic {
            Ok(mnemonic.clone())
        } else {
            Err(KeypairError::MissingMnemonic)
        }
    }
}

fn read_mnemonic_file(path: &Path) -> Result<String, KeypairError> {
    let contents = std::fs::read_to_string(path).map_err(|source| KeypairError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let file: KeypairFile =
        serde_json::from_str(&contents).map_err(|source| KeypairError::ParseFile {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(file.mnemonic)
}

/// Trims, collapses whitespace and lower-cases a mnemonic.
///
/// # Errors
///
/// Returns `KeypairError::MnemonicLength` if the word count is not a BIP39 length.
pub fn normalize_mnemonic(mnemonic: &str) -> Result<String, KeypairError> {
    let words: Vec<String> = mnemonic.split_whitespace().map(str::to_lowercase).collect();
    if !MNEMONIC_WORDS.contains(&words.len()) {
        return Err(KeypairError::MnemonicLength(words.len()));
    }
    Ok(words.join(" "))
}

/// Aptos only accepts fully hardened five level paths
fn is_valid_aptos_path(path: &str) -> bool {
    let Some(rest) = path.strip_prefix("m/44'/637'/") else {
        return false;
    };
    let levels: Vec<&str> = rest.split('/').collect();
    levels.len() == 3
        && levels.iter().all(|level| {
            level
                .strip_suffix('\'')
                .is_some_and(|index| !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()))
        })
}

/// Builds the derivation path of one account/address pair.
///
/// # Errors
///
/// Returns `KeypairError::InvalidCoinType` for unsupported coin types.
pub fn derivation_path(coin_type: u32, account: u32, address: u32) -> Result<String, KeypairError> {
    match coin_type {
        ETHEREUM => Ok(format!("m/44'/{coin_type}'/{account}'/0/{address}")),
        APTOS => {
            let path = format!("m/44'/{coin_type}'/{account}'/0'/{address}'");
            if is_valid_aptos_path(&path) {
                Ok(path)
            } else {
                Err(KeypairError::InvalidPath(path))
            }
        }
        other => Err(KeypairError::InvalidCoinType(other)),
    }
}

/// Derivation paths for every account, then address, in the given ranges.
///
/// # Errors
///
/// Returns `KeypairError::InvalidCoinType` for unsupported coin types.
pub fn derivation_paths(
    coin_type: u32,
    accounts: IndexRange,
    addresses: IndexRange,
) -> Result<Vec<String>, KeypairError> {
    accounts
        .iter()
        .flat_map(|account| addresses.iter().map(move |address| (account, address)))
        .map(|(account, address)| derivation_path(coin_type, account, address))
        .collect()
}

fn run(invocation: &Invocation<'_>) -> ActionResult {
    let args = EnumArgs::from_arg_matches(invocation.matches)?;
    debug!(
        "{}: coin type {}, accounts {:?}, addresses {:?}",
        invocation.command, args.coin_type, args.account_index, args.address_index
    );

    let mnemonic = normalize_mnemonic(&args.resolve_mnemonic()?)?;
    debug!(
        "{}: mnemonic of {} words is valid",
        invocation.command,
        mnemonic.split(' ').count()
    );
    for path in derivation_paths(args.coin_type, args.account_index, args.address_index)? {
        println!("path: {path}");
    }
    Ok(ExitCode::SUCCESS)
}

#[allow(clippy::unnecessary_wraps)]
#[must_use]
pub fn command() -> Option<CommandHandle> {
    let command = EnumArgs::augment_args(
        clap::Command::new("enum").about("Enumerate BIP44 derivation paths of a mnemonic"),
    );
    Some(CommandHandle::new(command).with_action(run))
}
