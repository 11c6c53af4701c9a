use anyhow::{anyhow, Context};
use authenex_lib::models::ContentKind;
use authenex_lib::services::detection::score_raw_response;
use std::io::Read;

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

/// First argument that is neither a flag nor a flag's value.
fn positional(args: &[String]) -> Option<String> {
    let mut skip_next = false;
    for arg in args.iter().skip(1) {
        if skip_next {
            skip_next = false;
            continue;
        }
        match arg.as_str() {
            "--kind" | "--out" => skip_next = true,
            a if a.starts_with("--") => {}
            a => return Some(a.to_string()),
        }
    }
    None
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        eprintln!(
            "Usage:\n  score_response [<raw_response.txt> | -] [--kind <image|text|email|audio|video|document>] [--out <json_path>] [--compact]\n\nReads a captured model response (stdin when no path or `-`) and prints the scored analysis."
        );
        return Ok(());
    }

    let kind_arg = parse_arg_value(&args, "--kind").unwrap_or_else(|| "image".to_string());
    let kind = ContentKind::parse(&kind_arg)
        .ok_or_else(|| anyhow!("unknown --kind {:?}", kind_arg))?;
    let out_path = parse_arg_value(&args, "--out");

    let raw = match positional(&args).filter(|p| p != "-") {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("read file failed: {}", path))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("read stdin failed")?;
            buf
        }
    };

    let response = score_raw_response(kind, &raw)?;
    let json = if has_flag(&args, "--compact") {
        serde_json::to_string(&response)?
    } else {
        serde_json::to_string_pretty(&response)?
    };

    match out_path {
        Some(out_path) => {
            std::fs::write(&out_path, &json)
                .with_context(|| format!("write out failed: {}", out_path))?;
            eprintln!(
                "{} | trust={:.1} | {:?}",
                response.verdict, response.trust_score, response.status
            );
            eprintln!("Wrote JSON: {}", out_path);
        }
        None => println!("{}", json),
    }

    Ok(())
}
