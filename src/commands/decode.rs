//! `msgsift decode`: dump one raw archive file.

use std::fs;

use anyhow::{Context, Result};

use msgsift::archive::typedstream;
use msgsift::cli::{ArchiveKind, DecodeArgs};
use msgsift::extract::payload_tokens;

const BPLIST_MAGIC: &[u8] = b"bplist00";

pub fn handle(args: DecodeArgs) -> Result<()> {
    let bytes = fs::read(&args.file).with_context(|| format!("Failed to read {:?}", args.file))?;
    let kind = args.kind.unwrap_or_else(|| detect_kind(&bytes));

    match kind {
        ArchiveKind::Typedstream => {
            let text = typedstream::decode_text(&bytes)
                .with_context(|| format!("Failed to decode typed stream {:?}", args.file))?;
            println!("{}", text);
        }
        ArchiveKind::Keyed => {
            let tokens = payload_tokens(&bytes)
                .with_context(|| format!("Failed to decode keyed archive {:?}", args.file))?;
            for token in tokens {
                println!("{}", token);
            }
        }
    }

    Ok(())
}

fn detect_kind(bytes: &[u8]) -> ArchiveKind {
    if bytes.starts_with(BPLIST_MAGIC) {
        ArchiveKind::Keyed
    } else {
        ArchiveKind::Typedstream
    }
}
