
extern crate clap;
extern crate env_logger;
extern crate exitcode;
extern crate log;

use clap::{value_t, App, Arg};
use log::{error, info};
use mimalloc::MiMalloc;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::Instant;

use orlbwt::fasta::{load_fasta, SEQ_TERMINATOR};
use orlbwt::online_rlbwt::OnlineRlbwt;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

fn main() {
    //initialize logging for our benefit later
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = App::new("orlbwt BWT builder")
        .version(VERSION.unwrap_or("?"))
        .about("orlbwt BWT builder - constructs a run-optimal BWT from a FASTA file")
        .arg(
            Arg::with_name("input")
                .short("i")
                .long("--input")
                .takes_value(true)
                .required(true)
                .help("The input FASTA file"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("--output")
                .takes_value(true)
                .help("Write the expanded BWT to this file"),
        )
        .get_matches();

    let in_fn: String = value_t!(matches.value_of("input"), String).unwrap_or_else(|e| e.exit());
    let out_fn: Option<String> = matches.value_of("output").map(|s| s.to_string());

    info!("Input parameters (required):");
    info!("\tinput: {:?}", in_fn);
    info!("\toutput: {:?}", out_fn.as_deref().unwrap_or("none"));

    let (text, num_seqs) = match load_fasta(&in_fn) {
        Ok(result) => result,
        Err(e) => {
            error!("Failed to load FASTA file: {:?}", in_fn);
            error!("Error: {:?}", e);
            std::process::exit(exitcode::NOINPUT);
        }
    };
    info!("Loaded {} sequences, {} bytes total", num_seqs, text.len());

    //check the output path up front so a bad one fails before the build
    if let Some(ref out_fn) = out_fn {
        if let Err(e) = File::create(out_fn) {
            error!("Failed to create output BWT file: {:?}", out_fn);
            error!("Error: {:?}", e);
            std::process::exit(exitcode::CANTCREAT);
        }
    }

    let start = Instant::now();
    let mut bwt = OnlineRlbwt::new();
    let mut cur_seqs: u64 = 0;
    for &b in text.iter() {
        bwt.spt_extend(b as u64);
        if b == SEQ_TERMINATOR {
            cur_seqs += 1;
            if cur_seqs % 10000 == 0 {
                info!(
                    "Extended {} / {} sequences in {:.1?}",
                    cur_seqs,
                    num_seqs,
                    start.elapsed()
                );
            }
        }
    }
    info!("Construction finished in {:.1?}", start.elapsed());
    bwt.log_statistics();

    if let Some(out_fn) = out_fn {
        //the 0 sentinel marks the end of the whole text in the output
        bwt.spt_extend(0);
        let result = File::create(&out_fn).map(BufWriter::new).and_then(|mut writer| {
            bwt.write_bwt(&mut writer)?;
            writer.flush()
        });
        match result {
            Ok(()) => info!("Saved BWT to file: {:?}", out_fn),
            Err(e) => {
                error!("Error saving BWT to file: {:?}", out_fn);
                error!("Error: {:?}", e);
                std::process::exit(exitcode::IOERR);
            }
        }
    }

    info!("Processes successfully finished.")
}
