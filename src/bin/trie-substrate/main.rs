//! Command-line tool for building and inspecting serialized bit vectors.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use trie_substrate::{BitVector, BuildFlags, ByteSink, FileWriter, Mapper};

#[derive(Debug, Parser)]
#[command(name = "trie-substrate")]
#[command(about = "Build and inspect rank/select bit vectors", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Build a bit vector from a text file of '0' and '1' characters
    Build(BuildArgs),
    /// Print the header and a few queries of a serialized bit vector
    Inspect(InspectArgs),
}

#[derive(Debug, Parser)]
struct BuildArgs {
    /// Input text file; characters other than '0' and '1' are ignored
    input: PathBuf,

    /// Output file for the serialized bit vector
    #[arg(short, long)]
    output: PathBuf,

    /// Build the select-1 index
    #[arg(long)]
    select1: bool,

    /// Build the select-0 index
    #[arg(long)]
    select0: bool,
}

#[derive(Debug, Parser)]
struct InspectArgs {
    /// Serialized bit vector
    file: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Build(args) => build(&args),
        Command::Inspect(args) => inspect(&args.file),
    }
}

fn build(args: &BuildArgs) -> Result<()> {
    let text = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read input: {}", args.input.display()))?;

    let mut bv = BitVector::new();
    bv.extend_bits(text.iter().filter_map(|&c| match c {
        b'0' => Some(false),
        b'1' => Some(true),
        _ => None,
    }))?;

    let mut flags = BuildFlags::RANK;
    if args.select1 {
        flags |= BuildFlags::SELECT_1;
    }
    if args.select0 {
        flags |= BuildFlags::SELECT_0;
    }
    bv.build(flags)?;

    let mut writer = FileWriter::create(&args.output)
        .with_context(|| format!("Failed to create output: {}", args.output.display()))?;
    bv.write(&mut writer)?;
    writer.flush()?;

    eprintln!(
        "Wrote {} bytes to {} (size={}, ones={})",
        bv.io_size(),
        args.output.display(),
        bv.size(),
        bv.num_1s()
    );
    Ok(())
}

fn inspect(path: &Path) -> Result<()> {
    let mapper =
        Mapper::open(path).with_context(|| format!("Failed to map: {}", path.display()))?;
    let bv = BitVector::map(&mapper)
        .with_context(|| format!("Not a serialized bit vector: {}", path.display()))?;
    if mapper.remaining() != 0 {
        bail!("{} trailing bytes after bit vector", mapper.remaining());
    }

    let header = bv.header();
    println!("size:    {}", header.size);
    println!("num_1s:  {}", header.num_1s);
    println!("num_0s:  {}", bv.num_0s());
    println!("flags:   {:?}", bv.flags());
    let (select_1s, select_0s) = bv.sample_counts();
    println!("samples: select_1={} select_0={}", select_1s, select_0s);

    for i in [0, bv.size() / 2, bv.size()] {
        println!("rank_1({}) = {}", i, bv.rank_1(i));
    }
    if bv.flags().contains(BuildFlags::SELECT_1) && bv.num_1s() > 0 {
        let last = bv.num_1s() - 1;
        println!("select_1(0) = {}", bv.select_1(0)?);
        println!("select_1({}) = {}", last, bv.select_1(last)?);
    }
    if bv.flags().contains(BuildFlags::SELECT_0) && bv.num_0s() > 0 {
        let last = bv.num_0s() - 1;
        println!("select_0(0) = {}", bv.select_0(0)?);
        println!("select_0({}) = {}", last, bv.select_0(last)?);
    }
    Ok(())
}
