use clap::{Parser, Subcommand};
use anyhow::{Context, Result};

use ricf_core as core;
use core::data::CovarianceMatrix;
use core::diagnostics::{free_parameters, ModelFit};
use core::fit::{Ricf, RicfResult};
use core::graph::{maximal_cliques, MixedGraph};

#[derive(Parser)]
#[command(name = "ricf")]
#[command(version)]
#[command(about = "Maximum-likelihood fitting of Gaussian ancestral graph models")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit an ancestral graph to a covariance matrix via RICF
    Fit {
        /// Path to the graph file
        #[arg(short, long)]
        graph: String,

        /// Path to a covariance CSV (header row of variable names)
        #[arg(long, conflicts_with = "data", requires = "sample_size")]
        cov: Option<String>,

        /// Number of observations behind --cov
        #[arg(short = 'n', long)]
        sample_size: Option<usize>,

        /// Path to a CSV of raw observations, one column per variable
        #[arg(short, long, required_unless_present = "cov")]
        data: Option<String>,

        /// Maximum number of RICF sweeps
        #[arg(long, default_value = "1000")]
        max_iter: usize,

        /// Convergence tolerance
        #[arg(long, default_value = "1e-6")]
        tolerance: f64,

        /// Return the last estimate instead of failing when the fit does not converge
        #[arg(long)]
        allow_non_convergence: bool,

        /// Output format: "text" (default) or "json"
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// List the maximal cliques of a graph, ignoring edge types
    Cliques {
        /// Path to the graph file
        #[arg(short, long)]
        graph: String,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Fit {
            graph,
            cov,
            sample_size,
            data,
            max_iter,
            tolerance,
            allow_non_convergence,
            format,
        } => cmd_fit(
            &graph,
            cov.as_deref(),
            sample_size,
            data.as_deref(),
            max_iter,
            tolerance,
            allow_non_convergence,
            &format,
        ),
        Commands::Cliques { graph } => cmd_cliques(&graph),
    }
}

fn load_graph(path: &str) -> Result<MixedGraph> {
    MixedGraph::from_file(path).with_context(|| format!("Failed to load graph from '{}'", path))
}

#[allow(clippy::too_many_arguments)]
fn cmd_fit(
    graph_path: &str,
    cov_path: Option<&str>,
    sample_size: Option<usize>,
    data_path: Option<&str>,
    max_iter: usize,
    tolerance: f64,
    allow_non_convergence: bool,
    output_format: &str,
) -> Result<()> {
    let graph = load_graph(graph_path)?;
    eprintln!(
        "Loaded graph with {} nodes, {} edges from '{}'",
        graph.node_names().len(),
        graph.edges().len(),
        graph_path
    );

    let cov = match (cov_path, data_path) {
        (Some(path), _) => {
            let n = sample_size.context("--sample-size is required with --cov")?;
            CovarianceMatrix::from_csv(path, n)
                .with_context(|| format!("Failed to load covariance matrix from '{}'", path))?
        }
        (None, Some(path)) => CovarianceMatrix::from_data_csv(path)
            .with_context(|| format!("Failed to load data from '{}'", path))?,
        (None, None) => anyhow::bail!("Either --cov or --data must be given"),
    };
    eprintln!(
        "Covariance of {} variables, {} observations",
        cov.dimension(),
        cov.sample_size()
    );

    let solver = Ricf::new(max_iter, tolerance).allow_non_convergence(allow_non_convergence);
    let result = solver.fit(&graph, &cov).context("RICF fitting failed")?;

    let fit = result
        .model_fit(cov.matrix(), cov.sample_size(), free_parameters(&graph))
        .context("Failed to evaluate the fitted covariance")?;

    match output_format.to_lowercase().as_str() {
        "json" => print_json(&result, &fit)?,
        _ => print_text(&result, &fit),
    }

    Ok(())
}

fn print_text(result: &RicfResult, fit: &ModelFit) {
    println!("{}", result.summary());
    println!("--- Model Fit ---");
    println!("Log-likelihood: {:.4}", fit.log_likelihood);
    println!("Deviance: {:.4}   df: {}", fit.deviance, fit.df);
    println!("AIC: {:.4}", fit.aic());
    println!("BIC: {:.4}", fit.bic());
}

fn matrix_json(m: &core::types::DenseMatrix) -> serde_json::Value {
    let rows: Vec<Vec<f64>> = m
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect();
    serde_json::json!(rows)
}

/// NaN and infinities are not valid JSON.
fn finite(x: f64) -> serde_json::Value {
    if x.is_finite() {
        serde_json::json!(x)
    } else {
        serde_json::Value::Null
    }
}

fn print_json(result: &RicfResult, fit: &ModelFit) -> Result<()> {
    let mut map = serde_json::Map::new();

    map.insert(
        "converged".to_string(),
        serde_json::Value::Bool(result.converged),
    );
    map.insert("iterations".to_string(), serde_json::json!(result.iterations));
    map.insert("delta".to_string(), finite(result.delta));
    map.insert("variables".to_string(), serde_json::json!(result.variable_names));

    map.insert("sigma_hat".to_string(), matrix_json(&result.sigma_hat));
    map.insert("lambda_hat".to_string(), matrix_json(&result.lambda_hat));
    map.insert("b_hat".to_string(), matrix_json(&result.b_hat));
    map.insert("omega_hat".to_string(), matrix_json(&result.omega_hat));

    // Directed edges with their (positive-sign) coefficients
    let beta = result.regression_coefficients();
    let mut coefficients = Vec::new();
    for v in 0..beta.nrows() {
        for u in 0..beta.ncols() {
            if u != v && beta[(v, u)] != 0.0 {
                coefficients.push(serde_json::json!({
                    "child": result.variable_names[v],
                    "parent": result.variable_names[u],
                    "estimate": beta[(v, u)],
                }));
            }
        }
    }
    map.insert("coefficients".to_string(), serde_json::json!(coefficients));

    map.insert(
        "model_fit".to_string(),
        serde_json::json!({
            "log_likelihood": finite(fit.log_likelihood),
            "deviance": finite(fit.deviance),
            "df": fit.df,
            "n_obs": fit.n_obs,
            "n_params": fit.n_params,
            "aic": finite(fit.aic()),
            "bic": finite(fit.bic()),
        }),
    );

    let json_str = serde_json::to_string_pretty(&serde_json::Value::Object(map))?;
    println!("{}", json_str);
    Ok(())
}

fn cmd_cliques(graph_path: &str) -> Result<()> {
    let graph = load_graph(graph_path)?;
    let cliques = maximal_cliques(&graph);

    println!("{} maximal cliques:", cliques.len());
    for clique in &cliques {
        let names: Vec<&str> = clique.iter().map(|&v| graph.node_name(v)).collect();
        println!("  {{{}}}", names.join(", "));
    }

    Ok(())
}
