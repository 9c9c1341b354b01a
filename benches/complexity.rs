use std::time::Duration;

use aw_voronoi::{compute, Site};
use rand::{Rng, SeedableRng};

fn random_sites(number: usize) {
    let mut rng = rand::rngs::SmallRng::from_seed([76; 32]); // chosen by fair dice roll
    let sites: Vec<Site> = (0..number)
        .map(|_| Site::new(rng.gen_range(0.0..1000.0), rng.gen_range(0.0..1000.0)))
        .collect();

    for _ in 0..10 {
        compute(sites.clone()).unwrap();
    }
}

fn main() {
    let mut n = 1;
    println!(" i |     N |    elapsed | increase ");
    let mut times: Vec<Duration> = Vec::new();
    for i in 0..=12 {
        let start = std::time::Instant::now();
        random_sites(n);
        let elapsed = start.elapsed();
        let increase = times
            .last()
            .map(|t| elapsed.as_secs_f64() / t.as_secs_f64())
            .unwrap_or(f64::NAN);
        println!("{:>2} | {:>5} | {:>10.3?} | {:.2}", i, n, elapsed, increase);

        times.push(elapsed);

        n *= 2;
    }
}
