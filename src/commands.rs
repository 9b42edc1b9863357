//! One function per subcommand. Reports go to `out`; logs go to stderr
//! through `tracing`.

use crate::cli::{HashArgs, IngestArgs, InspectArgs, KeyForm, PurgeArgs};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use surrogate_config::Config;
use surrogate_index::{Hasher, IngestEvent, KeyInput, RecordReader, Side, Store, Summary};

pub fn ingest(config: &Config, store: &Store, args: &IngestArgs, out: &mut impl Write) -> Result<()> {
    let input: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(File::open(path).or_raise(|| ErrorKind::Input)?)),
        None => Box::new(io::stdin().lock()),
    };
    let records = RecordReader::new(input, config.ingest.max_line_length);
    let mut written = Ok(());
    let stats = surrogate_index::ingest(store, &Hasher::new(), records, &config.ingest_options(), |event| {
        if let IngestEvent::Progress { records, elapsed } = event
            && written.is_ok()
        {
            written = writeln!(out, "{records} {:.3}", elapsed.as_secs_f64());
        }
    })
    .or_raise(|| ErrorKind::Ingest)?;
    written.or_raise(|| ErrorKind::Output)?;
    writeln!(
        out,
        "Total records: {}\nTotal keys added: {}\nTotal duplicates: {}\nTotal capped: {}\nTotal rejected: {}",
        stats.records, stats.keys_added, stats.duplicates, stats.capped, stats.rejected
    )
    .or_raise(|| ErrorKind::Output)
}

/// Resolve the key (asking on `terminal` for anything not given as an
/// argument), then purge it.
pub fn purge(
    store: &Store,
    args: &PurgeArgs,
    terminal: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    let key = match &args.key {
        Some(key) => key.clone(),
        None => prompt(terminal, out, "Enter in key to delete: ")?,
    };
    if key.is_empty() {
        exn::bail!(ErrorKind::InvalidAnswer(key));
    }
    let form = match KeyForm::from_flags(args.hashed, args.raw) {
        Some(form) => form,
        None => prompt(terminal, out, "Is this key hashed (yes/no)? ")?.parse()?,
    };
    let input = KeyInput::new(key.as_str(), form.is_hashed()).or_raise(|| ErrorKind::InvalidKey)?;
    let digest = input.resolve(&Hasher::new());

    let report = surrogate_index::purge(store, &digest).or_raise(|| ErrorKind::Purge)?;
    writeln!(out, "This key has {} image(s)", report.images).or_raise(|| ErrorKind::Output)?;
    for (n, url) in report.urls.iter().enumerate() {
        writeln!(out, "Image {} has {} key(s)", n + 1, url.siblings).or_raise(|| ErrorKind::Output)?;
    }
    writeln!(out, "{} instances of {key} deleted from data store", report.deleted).or_raise(|| ErrorKind::Output)?;
    if report.inconsistencies > 0 {
        writeln!(out, "{} inconsistent pair(s) found and removed", report.inconsistencies)
            .or_raise(|| ErrorKind::Output)?;
    }
    Ok(())
}

pub fn inspect(config: &Config, store: &Store, args: &InspectArgs, out: &mut impl Write) -> Result<()> {
    let side = if args.reverse { Side::Reverse } else { Side::Forward };
    let cap = config.index.fanout_cap;
    let mut summary = Summary::default();
    for entry in surrogate_index::scan(store, side).or_raise(|| ErrorKind::Inspect)? {
        let entry = entry.or_raise(|| ErrorKind::Inspect)?;
        summary.add(&entry, cap);
        if !args.at_cap || entry.count >= cap {
            writeln!(out, "{}\t{}", entry.digest, entry.count).or_raise(|| ErrorKind::Output)?;
        }
    }
    tracing::info!(keys = summary.keys, pairs = summary.pairs, at_cap = summary.at_cap, ?side, "Inspected store");
    eprintln!("{} key(s), {} pair(s), {} at the cap of {cap}", summary.keys, summary.pairs, summary.at_cap);
    Ok(())
}

pub fn verify(config: &Config, store: &Store, out: &mut impl Write) -> Result<()> {
    let report = surrogate_index::verify(store, config.index.fanout_cap).or_raise(|| ErrorKind::Inspect)?;
    writeln!(
        out,
        "forward: {} key(s), {} pair(s)\nreverse: {} key(s), {} pair(s)\nmissing reverse: {}\nmissing forward: {}\nover cap: {}",
        report.forward_keys,
        report.forward_pairs,
        report.reverse_keys,
        report.reverse_pairs,
        report.missing_reverse,
        report.missing_forward,
        report.over_cap,
    )
    .or_raise(|| ErrorKind::Output)?;
    if !report.is_consistent() {
        exn::bail!(ErrorKind::Inconsistent);
    }
    Ok(())
}

pub fn hash(args: &HashArgs, out: &mut impl Write) -> Result<()> {
    let hasher = Hasher::new();
    for value in &args.values {
        writeln!(out, "{}\t{value}", hasher.hash(value)).or_raise(|| ErrorKind::Output)?;
    }
    Ok(())
}

/// Write `question`, then read one line of answer without its terminator.
fn prompt(terminal: &mut impl BufRead, out: &mut impl Write, question: &str) -> Result<String> {
    write!(out, "{question}").or_raise(|| ErrorKind::Output)?;
    out.flush().or_raise(|| ErrorKind::Output)?;
    let mut answer = String::new();
    terminal.read_line(&mut answer).or_raise(|| ErrorKind::Prompt)?;
    Ok(answer.trim_end_matches(['\r', '\n']).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::ops::Deref;
    use surrogate_index::IngestOptions;

    fn store_with(lines: &str) -> Store {
        let store = Store::open_in_memory().unwrap();
        let records = RecordReader::new(Cursor::new(lines.as_bytes().to_vec()), 500);
        surrogate_index::ingest(&store, &Hasher::new(), records, &IngestOptions::default(), |_| {}).unwrap();
        store
    }

    fn purge_args(key: Option<&str>, hashed: bool, raw: bool) -> PurgeArgs {
        PurgeArgs {
            key: key.map(str::to_string),
            hashed,
            raw,
        }
    }

    #[test]
    fn test_purge_with_arguments() {
        let store = store_with("http://a.com k1 k2\nhttp://b.com k2 k3\n");
        let mut out = Vec::new();
        purge(&store, &purge_args(Some("k1"), false, true), &mut Cursor::new(""), &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "This key has 1 image(s)\nImage 1 has 2 key(s)\n2 instances of k1 deleted from data store\n"
        );
    }

    #[test]
    fn test_purge_prompts_for_missing_input() {
        let store = store_with("http://a.com k1\n");
        let digest = Hasher::new().hash("k1").to_hex();
        let mut terminal = Cursor::new(format!("{digest}\nyes\n"));
        let mut out = Vec::new();
        purge(&store, &purge_args(None, false, false), &mut terminal, &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("Enter in key to delete: Is this key hashed (yes/no)? This key has 1 image(s)\n"));
        assert!(out.ends_with(&format!("1 instances of {digest} deleted from data store\n")));
    }

    #[test]
    fn test_purge_rejects_invalid_answer() {
        let store = store_with("http://a.com k1\n");
        let mut terminal = Cursor::new("maybe\n");
        let err = purge(&store, &purge_args(Some("k1"), false, false), &mut terminal, &mut Vec::new()).unwrap_err();
        assert_eq!(*err.deref(), ErrorKind::InvalidAnswer("maybe".to_string()));
    }

    #[test]
    fn test_purge_rejects_bad_hex() {
        let store = store_with("http://a.com k1\n");
        let err = purge(&store, &purge_args(Some("k1"), true, false), &mut Cursor::new(""), &mut Vec::new()).unwrap_err();
        assert_eq!(*err.deref(), ErrorKind::InvalidKey);
    }

    #[test]
    fn test_purge_unknown_key() {
        let store = store_with("http://a.com k1\n");
        let err = purge(&store, &purge_args(Some("k9"), false, true), &mut Cursor::new(""), &mut Vec::new()).unwrap_err();
        assert_eq!(*err.deref(), ErrorKind::Purge);
    }

    #[test]
    fn test_inspect_at_cap() {
        let store = store_with("http://a.com k1 k2\nhttp://b.com k2 k3\n");
        let config = Config {
            index: surrogate_config::IndexConfig { fanout_cap: 2 },
            ..Config::default()
        };
        let args = InspectArgs {
            reverse: false,
            at_cap: true,
        };
        let mut out = Vec::new();
        inspect(&config, &store, &args, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("{}\t2\n", Hasher::new().hash("k2")));
    }

    #[test]
    fn test_verify_clean_store() {
        let store = store_with("http://a.com k1 k2\n");
        let mut out = Vec::new();
        verify(&Config::default(), &store, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("missing reverse: 0\nmissing forward: 0\n"));
    }

    #[test]
    fn test_hash() {
        let mut out = Vec::new();
        hash(
            &HashArgs {
                values: vec!["k1".to_string()],
            },
            &mut out,
        )
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("{}\tk1\n", Hasher::new().hash("k1")));
    }
}
