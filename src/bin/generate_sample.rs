use anyhow::Context;
use serde::Serialize;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

/// One demo row. `None` fields are written as empty cells.
#[derive(Serialize)]
struct SaleRow {
    day: u32,
    region: &'static str,
    price: f64,
    units: i64,
    ad_spend: f64,
    revenue: f64,
    temperature: Option<f64>,
    promo: bool,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn main() -> anyhow::Result<()> {
    let output_path = std::env::args().nth(1).unwrap_or_else(|| "sample_data.csv".into());
    let mut rng = SimpleRng::new(42);

    let regions = ["north", "south", "east", "west"];
    let mut writer =
        csv::Writer::from_path(&output_path).with_context(|| format!("creating {output_path}"))?;

    let n_rows = 200;
    for day in 0..n_rows {
        let region = rng.pick(&regions);
        let promo = rng.next_f64() < 0.25;
        let price = rng.gauss(20.0, 4.0).max(1.0);
        let ad_spend = rng.gauss(500.0, 150.0).max(0.0);
        // Demand falls with price, rises with advertising and promotions.
        let demand = 120.0 - 3.5 * price + 0.08 * ad_spend + if promo { 25.0 } else { 0.0 };
        let units = (demand + rng.gauss(0.0, 8.0)).round().max(0.0) as i64;
        // Roughly one in twenty sensor readings is missing.
        let temperature = (rng.next_f64() >= 0.05).then(|| round2(rng.gauss(18.0, 6.0)));

        writer
            .serialize(SaleRow {
                day,
                region,
                price: round2(price),
                units,
                ad_spend: round2(ad_spend),
                revenue: round2(price * units as f64),
                temperature,
                promo,
            })
            .context("writing row")?;
    }
    writer.flush().context("flushing output")?;

    println!("Wrote {n_rows} rows ({} regions) to {output_path}", regions.len());
    Ok(())
}
