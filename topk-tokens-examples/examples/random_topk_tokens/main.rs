use anyhow::Result;
use clap::Parser;
use rand::{Rng, SeedableRng};
use topk_tokens::{topk_tokens, TopkTokensOptions};
use topk_tokens_examples::{placeholder_tokens, random_activations};

#[derive(Debug, Parser)]
#[command(about = "Select the top-k tokens of random activations")]
struct Args {
    /// The number of samples in the batch.
    #[arg(long, default_value = "3")]
    num_samples: usize,

    /// The number of layers (outer dimension).
    #[arg(long, default_value = "2")]
    num_layers: usize,

    /// The number of neurons (inner dimension).
    #[arg(long, default_value = "4")]
    num_neurons: usize,

    /// The maximum number of top and bottom activations per sample.
    #[arg(long, default_value = "3")]
    max_k: usize,

    /// The seed of the random number generator.
    #[arg(long, default_value = "42")]
    seed: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = rand::rngs::StdRng::seed_from_u64(args.seed);

    let mut tokens = Vec::with_capacity(args.num_samples);
    let mut activations = Vec::with_capacity(args.num_samples);
    for _ in 0..args.num_samples {
        let n_tokens = rng.gen_range(1..=8);
        tokens.push(placeholder_tokens(n_tokens));
        activations.push(random_activations(
            &mut rng,
            args.num_layers,
            n_tokens,
            args.num_neurons,
        )?);
    }

    let props = topk_tokens(
        tokens,
        &activations,
        Some(TopkTokensOptions {
            max_k: args.max_k,
            sample_labels: Some(
                (0..args.num_samples)
                    .map(|i| format!("Sample {}", i))
                    .collect(),
            ),
            ..Default::default()
        }),
    )?;

    for (i, sample) in props.topk_idxs.iter().enumerate() {
        let top_tokens: Vec<&String> = sample
            .iter()
            .filter_map(|layer| layer.first()?.first())
            .map(|&token| &props.tokens[i][token as usize])
            .collect();
        println!(
            "Sample {}: {} tokens, top token of the first neuron per layer: {:?}",
            i,
            props.tokens[i].len(),
            top_tokens
        );
    }
    println!("{}", props.to_json()?);

    Ok(())
}
