use clap::{Arg, ArgAction, ArgMatches, Command};
use primerkit::{
    ENZYMES,
    assembly::CloningMethod,
    design::{DesignConfig, DesignRequest, run_design},
    digest::digest_circular,
    dna_sequence::DNAsequence,
    primer::analyze_oligo,
    restriction_enzyme::RestrictionEnzyme,
};
use primerkit_protocol::{FragmentRecord, records_to_fasta};
use serde::Serialize;
use std::fs;

#[derive(Serialize)]
struct DigestSummary {
    sequence: String,
    length: usize,
    enzymes: Vec<String>,
    missing: Vec<String>,
    fragments: Vec<FragmentRecord>,
}

#[derive(Serialize)]
struct EnzymeSummary<'a> {
    #[serde(flatten)]
    enzyme: &'a RestrictionEnzyme,
    sticky_end: Option<String>,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Could not serialize JSON output: {e}"))?;
    println!("{text}");
    Ok(())
}

fn load_config(matches: &ArgMatches) -> Result<DesignConfig, String> {
    match matches.get_one::<String>("config") {
        Some(value) => DesignConfig::from_json_arg(value).map_err(|e| e.to_string()),
        None => Ok(DesignConfig::default()),
    }
}

fn load_circular(path: &str) -> Result<DNAsequence, String> {
    let mut dna = DNAsequence::from_file(path).map_err(|e| e.to_string())?;
    dna.set_circular(true);
    Ok(dna)
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .value_name("JSON")
        .help("Design configuration as inline JSON or @file.json")
}

fn enzyme_arg() -> Arg {
    Arg::new("enzyme")
        .short('e')
        .long("enzyme")
        .value_name("NAME")
        .action(ArgAction::Append)
        .help("Restriction enzyme (repeatable)")
}

fn cli() -> Command {
    Command::new("primerkit")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Primer design for overlap and uracil-excision cloning")
        .subcommand_required(true)
        .subcommand(
            Command::new("design")
                .about("Design primers to clone inserts into a vector")
                .arg(
                    Arg::new("vector")
                        .long("vector")
                        .value_name("FILE")
                        .required(true)
                        .help("Vector sequence (plain, FASTA or GenBank)"),
                )
                .arg(
                    Arg::new("insert")
                        .long("insert")
                        .value_name("FILE")
                        .required(true)
                        .action(ArgAction::Append)
                        .help("Insert sequence, in assembly order (repeatable)"),
                )
                .arg(
                    Arg::new("linker")
                        .long("linker")
                        .value_name("SEQ")
                        .action(ArgAction::Append)
                        .allow_hyphen_values(true)
                        .help("Linker between consecutive inserts (repeatable, may be empty)"),
                )
                .arg(enzyme_arg())
                .arg(
                    Arg::new("insert-at")
                        .long("insert-at")
                        .value_name("POS")
                        .value_parser(clap::value_parser!(usize))
                        .help("Open the vector at this position instead of digesting it"),
                )
                .arg(
                    Arg::new("method")
                        .short('m')
                        .long("method")
                        .value_name("METHOD")
                        .default_value("overlap")
                        .help("Cloning method: overlap or uracil"),
                )
                .arg(config_arg())
                .arg(
                    Arg::new("fasta-out")
                        .long("fasta-out")
                        .value_name("FILE")
                        .help("Write the construct and primers as FASTA"),
                ),
        )
        .subcommand(
            Command::new("tm")
                .about("Melting temperature and structure of an oligo")
                .arg(Arg::new("sequence").value_name("SEQ").required(true))
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("digest")
                .about("Digest a circular sequence")
                .arg(Arg::new("file").value_name("FILE").required(true))
                .arg(enzyme_arg().required(true)),
        )
        .subcommand(Command::new("enzymes").about("List the restriction enzyme registry"))
}

fn cmd_design(matches: &ArgMatches) -> Result<(), String> {
    let config = load_config(matches)?;
    let method: CloningMethod = matches
        .get_one::<String>("method")
        .map(|m| m.parse::<CloningMethod>())
        .transpose()
        .map_err(|e| e.to_string())?
        .unwrap_or(CloningMethod::Overlap);
    let vector_path = matches
        .get_one::<String>("vector")
        .ok_or("Missing --vector")?;
    let inserts = strings(matches, "insert")
        .iter()
        .map(|path| DNAsequence::from_file(path).map_err(|e| e.to_string()))
        .collect::<Result<Vec<_>, _>>()?;
    let request = DesignRequest {
        method,
        vector: load_circular(vector_path)?,
        inserts,
        linkers: strings(matches, "linker"),
        enzymes: strings(matches, "enzyme"),
        insert_at: matches.get_one::<usize>("insert-at").copied(),
    };
    let result = run_design(&request, &config).map_err(|e| e.to_string())?;
    if let Some(path) = matches.get_one::<String>("fasta-out") {
        fs::write(path, records_to_fasta(&result.fasta_records()))
            .map_err(|e| format!("Could not write FASTA file '{path}': {e}"))?;
    }
    print_json(&result.to_report())
}

fn cmd_tm(matches: &ArgMatches) -> Result<(), String> {
    let config = load_config(matches)?;
    let text = matches
        .get_one::<String>("sequence")
        .ok_or("Missing sequence")?;
    let dna = DNAsequence::from_sequence(text).map_err(|e| e.to_string())?;
    print_json(&analyze_oligo(dna.forward(), &config.conditions()))
}

fn cmd_digest(matches: &ArgMatches) -> Result<(), String> {
    let path = matches.get_one::<String>("file").ok_or("Missing file")?;
    let dna = load_circular(path)?;
    let selection = ENZYMES.resolve(&strings(matches, "enzyme"));
    let digestion = digest_circular(&dna, &selection.found);
    print_json(&DigestSummary {
        sequence: dna.name().unwrap_or(path.as_str()).to_string(),
        length: dna.len(),
        enzymes: selection.found.iter().map(|e| e.name.clone()).collect(),
        missing: selection.missing,
        fragments: digestion.fragments.iter().map(|f| f.to_record()).collect(),
    })
}

fn cmd_enzymes() -> Result<(), String> {
    let enzymes: Vec<EnzymeSummary> = ENZYMES
        .restriction_enzymes()
        .map(|enzyme| EnzymeSummary {
            enzyme,
            sticky_end: enzyme.sticky_end(),
        })
        .collect();
    print_json(&enzymes)
}

fn run() -> Result<(), String> {
    let matches = cli().get_matches();
    match matches.subcommand() {
        Some(("design", sub)) => cmd_design(sub),
        Some(("tm", sub)) => cmd_tm(sub),
        Some(("digest", sub)) => cmd_digest(sub),
        Some(("enzymes", _)) => cmd_enzymes(),
        _ => Err("Missing command".to_string()),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
