// Copyright 2016-2019 Johannes Köster, David Lähnemann.
// Licensed under the GNU GPLv3 license (https://opensource.org/licenses/GPL-3.0)
// This file may not be copied, modified, or distributed
// except according to those terms.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use itertools::Itertools;
use structopt::StructOpt;

use crate::calculation::batch::calculate_batch;
use crate::calculation::match_probability::{
    MatchProbabilityCalculatorBuilder, MatchProbabilityInput,
};
use crate::config::CalculatorConfig;
use crate::frequencies::{CsvFrequencySetRepository, FrequencyIndexCache};
use crate::phenotype::{Phenotype, PhenotypeExpander};
use crate::typing::{classify, ConversionChain, HlaConverter, NomenclatureTables};

#[derive(Debug, StructOpt, Clone)]
#[structopt(
    name = "hla-match-prob",
    about = "Probabilities of HLA mismatches between patients and donors with ambiguous typings."
)]
#[structopt(setting = structopt::clap::AppSettings::ColoredHelp)]
pub struct Opt {
    #[structopt(short, long, help = "Print debug messages.")]
    pub verbose: bool,
    #[structopt(subcommand)]
    pub command: HlaMatchProb,
}

#[derive(Debug, StructOpt, Clone)]
pub enum HlaMatchProb {
    #[structopt(
        name = "calculate",
        about = "Calculate match probabilities for a batch of patient/donor pairs."
    )]
    #[structopt(setting = structopt::clap::AppSettings::ColoredHelp)]
    Calculate {
        #[structopt(
            parse(from_os_str),
            long,
            help = "JSON file with a list of patient/donor calculation requests."
        )]
        input: PathBuf,
        #[structopt(
            parse(from_os_str),
            long,
            help = "Directory with haplotype frequency sets, stored as <nomenclature-version>/<population-id>.csv."
        )]
        frequencies: PathBuf,
        #[structopt(
            parse(from_os_str),
            long,
            help = "JSON file with nomenclature tables used to convert ambiguous codes."
        )]
        nomenclature: Option<PathBuf>,
        #[structopt(parse(from_os_str), long, help = "YAML file with calculator settings.")]
        config: Option<PathBuf>,
        #[structopt(
            parse(from_os_str),
            long,
            help = "JSON file that shall contain the results (if omitted, write to STDOUT)."
        )]
        output: Option<PathBuf>,
        #[structopt(
            long,
            help = "Number of threads (overrides the configuration, 0 means one per core)."
        )]
        threads: Option<usize>,
    },
    #[structopt(
        name = "expand",
        about = "List the candidate genotypes of a phenotype."
    )]
    #[structopt(setting = structopt::clap::AppSettings::ColoredHelp)]
    Expand {
        #[structopt(parse(from_os_str), help = "JSON file with the phenotype.")]
        phenotype: PathBuf,
        #[structopt(
            parse(from_os_str),
            long,
            help = "JSON file with nomenclature tables used to convert ambiguous codes."
        )]
        nomenclature: Option<PathBuf>,
        #[structopt(long, help = "Nomenclature version of the typings.")]
        nomenclature_version: String,
        #[structopt(long, help = "Maximum number of genotypes to print.")]
        limit: Option<usize>,
    },
    #[structopt(
        name = "classify",
        about = "Print the typing category of HLA typings."
    )]
    #[structopt(setting = structopt::clap::AppSettings::ColoredHelp)]
    Classify {
        #[structopt(help = "Typings to classify, e.g. 01:01, 01:XX or 01:AB.")]
        typings: Vec<String>,
    },
}

fn load_nomenclature(path: Option<&PathBuf>) -> Result<NomenclatureTables> {
    match path {
        Some(path) => NomenclatureTables::from_path(path),
        None => {
            warn!("no nomenclature tables given, ambiguous codes cannot be converted");
            Ok(NomenclatureTables::default())
        }
    }
}

fn writer(path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path).with_context(|| {
            format!("unable to create output file {}", path.display())
        })?)),
        None => Box::new(io::stdout()),
    })
}

fn read_json<T, P>(path: P) -> Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())
        .with_context(|| format!("unable to open {}", path.as_ref().display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("invalid JSON in {}", path.as_ref().display()))
}

pub fn run(opt: Opt) -> Result<()> {
    match opt.command {
        HlaMatchProb::Calculate {
            ref input,
            ref frequencies,
            ref nomenclature,
            ref config,
            ref output,
            threads,
        } => {
            let mut config = match config {
                Some(path) => CalculatorConfig::from_path(path)?,
                None => CalculatorConfig::default(),
            };
            if let Some(threads) = threads {
                config.threads = threads;
            }
            let threads = config.threads;

            let inputs: Vec<MatchProbabilityInput> = read_json(input)?;
            let converter: Arc<dyn HlaConverter> =
                Arc::new(load_nomenclature(nomenclature.as_ref())?);
            let repository = CsvFrequencySetRepository::new(frequencies.to_owned());
            let cache = FrequencyIndexCache::build(
                &repository,
                inputs
                    .iter()
                    .flat_map(|input| input.required_frequency_sets()),
            );

            let calculator = MatchProbabilityCalculatorBuilder::default()
                .frequencies(&cache)
                .converter(converter)
                .config(config)
                .build()?;
            let outcomes = calculate_batch(&calculator, &inputs, threads)?;

            let mut writer = writer(output.as_ref())?;
            serde_json::to_writer_pretty(&mut writer, &outcomes)?;
            writeln!(writer)?;
            writer.flush()?;
        }
        HlaMatchProb::Expand {
            ref phenotype,
            ref nomenclature,
            ref nomenclature_version,
            limit,
        } => {
            let phenotype: Phenotype = read_json(phenotype)?;
            let converter: Arc<dyn HlaConverter> =
                Arc::new(load_nomenclature(nomenclature.as_ref())?);
            let conversion = ConversionChain::with_fallbacks(converter, nomenclature_version, &[]);
            let expanded = PhenotypeExpander::new(&conversion).expand(&phenotype);
            info!("{} candidate genotypes", expanded.genotype_count());

            let stdout = io::stdout();
            let mut writer = stdout.lock();
            for genotype in expanded
                .genotypes()
                .take(limit.unwrap_or(usize::max_value()))
            {
                writeln!(writer, "{}", genotype.display())?;
            }
        }
        HlaMatchProb::Classify { ref typings } => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            for typing in typings {
                match classify(typing) {
                    Ok(classified) => {
                        let alleles = classified
                            .local_alleles()
                            .map(|alleles| alleles.iter().join("/"))
                            .unwrap_or_default();
                        writeln!(writer, "{}\t{}\t{}", typing, classified.category(), alleles)?
                    }
                    Err(e) => writeln!(writer, "{}\terror\t{}", typing, e)?,
                }
            }
        }
    }
    Ok(())
}
