// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! `smas` — the CLI front-end for the assembler/linker library. Reads
//! a source file, assembles and links it, and writes the resulting
//! executable image to disk. Contains no assembler/linker logic of its
//! own: argument parsing, file I/O, and error rendering only.
use std::error::Error;
use std::fs;

use clap::{arg, Arg, ArgMatches, Command};
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
//
use memmap2::Mmap;
use smvm_as::executable::Executable;
use smvm_as::instructions::BuiltinDirectory;
use smvm_as::{assembler, lexer, linker};

fn main() -> Result<(), Box<dyn Error>> {
    // Parse command-line arguments
    let matches = Command::new("smas")
        .about("Single-pass assembler and linker for SMVM bytecode")
        .version("0.1.0")
        .arg(arg!(--verbose "Show verbose output"))
        .arg(arg!(--mmap "Memory-map the input file instead of reading it into memory"))
        .arg(Arg::new("input").required(true))
        .arg(Arg::new("output").short('o').long("output").default_value("a.out"))
        .arg(Arg::new("version").long("version").default_value("0"))
        .arg(Arg::new("active-unit").long("active-unit").default_value("0"))
        .get_matches();
    // Extract top-level flags
    let verbose = matches.is_present("verbose");
    // Initialise logging
    if verbose {
        init_logging(LevelFilter::Info);
    }
    // Dispatch
    let ok = assemble(&matches)?;
    // Determine appropriate exit code
    let exitcode = if ok { 0 } else { 1 };
    std::process::exit(exitcode);
}

/// Reads, tokenizes, assembles and links the requested source file,
/// writing the resulting executable image to the requested output
/// path. Returns `Ok(false)` (never `Err`-free) on a structured
/// pipeline failure so `main` can choose the process exit code without
/// every failure needing to be a panic.
fn assemble(args: &ArgMatches) -> Result<bool, Box<dyn Error>> {
    let input_path = args.get_one::<String>("input").unwrap();
    let output_path = args.get_one::<String>("output").unwrap();
    let version: u16 = args.get_one::<String>("version").unwrap().parse()?;
    let active_unit: u8 = args.get_one::<String>("active-unit").unwrap().parse()?;

    let source = read_source(input_path, args.is_present("mmap"))?;

    let tokens = match lexer::tokenize(&source) {
        Ok(tokens) => tokens,
        Err(e) => {
            eprintln!("tokenization failed at line {}, column {}", e.line, e.column);
            return Ok(false);
        }
    };
    log::info!("tokenized {} into {} tokens", input_path, tokens.len());

    let directory = BuiltinDirectory::new();
    let mut exe: Executable = match assembler::assemble(&tokens, &directory) {
        Ok(exe) => exe,
        Err(e) => {
            eprintln!("assembly failed: {e}");
            return Ok(false);
        }
    };
    exe.set_active_unit(active_unit);
    log::info!("assembled {} linking unit(s)", exe.unit_count());

    let image = match linker::link(&exe, version) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("linking failed: {e}");
            return Ok(false);
        }
    };
    log::info!("linked {} bytes", image.len());

    fs::write(output_path, &image)?;
    Ok(true)
}

/// Reads the source file either as an owned buffer or, when `--mmap`
/// is given, via a read-only memory map. Large source files are
/// cheaper to tokenize from a mapped view than a fully-read copy.
fn read_source(path: &str, use_mmap: bool) -> Result<Vec<u8>, Box<dyn Error>> {
    if use_mmap {
        let file = fs::File::open(path)?;
        let map = unsafe { Mmap::map(&file)? };
        Ok(map.as_ref().to_vec())
    } else {
        Ok(fs::read(path)?)
    }
}

/// Configures the `log` facade with a console appender, matching the
/// pattern used throughout the `sharemind` CLI tools.
fn init_logging(level: LevelFilter) {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("[{l}] {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))
        .unwrap();
    log4rs::init_config(config).unwrap();
}
