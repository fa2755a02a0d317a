use mlflow_rest::{backend::observer::PrettyPrinter, Client, Server};
use std::sync::Arc;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let client = Server::builder("http://localhost:5000")
        .observer(Arc::new(PrettyPrinter::stdout()))
        .build();

    for (name, location) in [("test1", "./mlruns/1"), ("test2", "./mlruns/2")] {
        match client.create_experiment(name, location) {
            Ok(id) => println!("Created {} with id {}", name, id),
            Err(err) if err.is_already_exists() => println!("{} already exists", name),
            Err(err) => panic!("Could not create {}: {}", name, err),
        }
    }

    let experiments = client
        .list_experiments()
        .expect("Could not list the experiments");
    println!("The server knows {} experiments", experiments.len());
}
