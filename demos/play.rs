use anyhow::Result;
use mlflow_rest::{tracking::TrackingRun, Client, SearchRuns, Server, ViewType};
use nanorand::{WyRand, RNG};

struct Args {
    experiment: String,
    create: bool,
    runs: u32,
}

impl Args {
    pub fn from_env() -> Result<Self> {
        let mut args = pico_args::Arguments::from_env();
        Ok(Args {
            experiment: args.value_from_str(["-e", "--experiment"])?,
            create: args.contains(["-c", "--create"]),
            runs: args.opt_value_from_str(["-r", "--runs"])?.unwrap_or(1),
        })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::from_env()?;
    let client = match Server::from_env() {
        Ok(client) => client,
        Err(_) => Server::new("http://127.0.0.1", "5000"),
    };

    let experiment = if args.create {
        match client.create_experiment(&args.experiment, "") {
            Ok(id) => {
                println!("Experiment with id {} was created successfully!", id);
                client.get_experiment(&id)?
            }
            Err(err) if err.is_already_exists() => {
                println!("The experiment {} already exists.", args.experiment);
                println!("Run again without the -c or --create flag to fetch the existing experiment.");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }
    } else {
        match client.get_experiment_by_name(&args.experiment) {
            Ok(experiment) => {
                println!(
                    "Experiment {} with id {} was fetched successfully!",
                    experiment.name, experiment.experiment_id,
                );
                experiment
            }
            Err(err) if err.is_not_found() => {
                println!("The experiment {} does not exists.", args.experiment);
                println!("Run again with the -c or --create flag to create a new experiment.");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }
    };

    for i in 0..args.runs {
        println!("Executing run {}", i);
        let mut run = TrackingRun::new();
        run.log_param("i", &format!("{}", i))?;
        run.log_param("constant", "42")?;
        let mut rng = WyRand::new_seed(i.into());
        for s in 0..10 {
            let int: f64 = rng.generate::<u16>().into();
            let max: f64 = std::u16::MAX.into();
            run.log_metric("rand", int / max, s);
        }
        run.submit(&client, &experiment.experiment_id)?;
    }

    let query = SearchRuns::new([experiment.experiment_id.clone()])
        .view(ViewType::All)
        .order_by("start_time DESC")
        .max_results(50);
    for page in client.search_runs_pages(query) {
        for run in page?.runs {
            println!("{} {:?}", run.info.run_id, run.info.status);
        }
    }

    Ok(())
}
