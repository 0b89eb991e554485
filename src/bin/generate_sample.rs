use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

/// (model, type, cylinders, new price)
const MODELS: [(&str, &str, f64, f64); 12] = [
    ("ford f-150", "pickup", 8.0, 38_000.0),
    ("ford focus", "sedan", 4.0, 19_000.0),
    ("chevrolet silverado 1500", "pickup", 8.0, 40_000.0),
    ("chevrolet malibu", "sedan", 4.0, 22_000.0),
    ("toyota camry", "sedan", 4.0, 25_000.0),
    ("toyota tacoma", "pickup", 6.0, 30_000.0),
    ("honda civic", "sedan", 4.0, 21_000.0),
    ("honda pilot", "SUV", 6.0, 34_000.0),
    ("jeep wrangler", "SUV", 6.0, 32_000.0),
    ("ram 1500", "truck", 8.0, 39_000.0),
    ("nissan altima", "sedan", 4.0, 24_000.0),
    ("bmw x5", "SUV", 6.0, 58_000.0),
];

const CONDITIONS: [&str; 6] = ["new", "like new", "excellent", "good", "fair", "salvage"];
const FUELS: [&str; 4] = ["gas", "gas", "diesel", "hybrid"];
const TRANSMISSIONS: [&str; 3] = ["automatic", "automatic", "manual"];
const COLORS: [&str; 7] = ["white", "black", "silver", "grey", "red", "blue", "custom"];

/// One output row, serialised with the public dataset's column names.
#[derive(Debug, Serialize)]
struct Row {
    price: f64,
    model_year: Option<i64>,
    model: String,
    condition: String,
    cylinders: Option<f64>,
    fuel: String,
    odometer: Option<f64>,
    transmission: String,
    #[serde(rename = "type")]
    vehicle_type: String,
    paint_color: Option<String>,
    is_4wd: Option<f64>,
    date_posted: String,
    days_listed: i64,
}

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
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
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

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len())]
    }
}

fn generate(rng: &mut SimpleRng, n: usize) -> Vec<Row> {
    (0..n)
        .map(|_| {
            let (model, vehicle_type, cylinders, new_price) = MODELS[rng.below(MODELS.len())];
            let year = 1995 + rng.below(25) as i64;
            let age = (2019 - year).max(0) as f64;
            let condition_idx = rng.below(CONDITIONS.len());
            let odometer = (age * 11_000.0 * (0.5 + rng.next_f64())).round();
            let wear = 1.0 - 0.08 * condition_idx as f64;
            let price = (new_price * 0.88f64.powf(age) * wear * (0.8 + 0.4 * rng.next_f64())).round();
            let four_wd = matches!(vehicle_type, "pickup" | "SUV" | "truck") && rng.chance(0.7);
            let month = 1 + rng.below(12);
            let day = 1 + rng.below(28);

            Row {
                price,
                model_year: (!rng.chance(0.07)).then_some(year),
                model: model.to_string(),
                condition: CONDITIONS[condition_idx].to_string(),
                cylinders: (!rng.chance(0.10)).then_some(cylinders),
                fuel: rng.pick(&FUELS).to_string(),
                odometer: (!rng.chance(0.15)).then_some(odometer),
                transmission: rng.pick(&TRANSMISSIONS).to_string(),
                vehicle_type: vehicle_type.to_string(),
                paint_color: (!rng.chance(0.18)).then(|| rng.pick(&COLORS).to_string()),
                is_4wd: four_wd.then_some(1.0),
                date_posted: format!("2018-{month:02}-{day:02}"),
                days_listed: rng.below(120) as i64,
            }
        })
        .collect()
}

fn write_parquet(rows: &[Row], path: &str) {
    let text = |f: fn(&Row) -> Option<&str>| -> ArrayRef {
        Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
    };
    let float = |f: fn(&Row) -> Option<f64>| -> ArrayRef {
        Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new("price", DataType::Float64, false),
        Field::new("model_year", DataType::Int64, true),
        Field::new("model", DataType::Utf8, false),
        Field::new("condition", DataType::Utf8, false),
        Field::new("cylinders", DataType::Float64, true),
        Field::new("fuel", DataType::Utf8, false),
        Field::new("odometer", DataType::Float64, true),
        Field::new("transmission", DataType::Utf8, false),
        Field::new("type", DataType::Utf8, false),
        Field::new("paint_color", DataType::Utf8, true),
        Field::new("is_4wd", DataType::Float64, true),
        Field::new("date_posted", DataType::Utf8, false),
        Field::new("days_listed", DataType::Int64, false),
    ]));

    let columns: Vec<ArrayRef> = vec![
        float(|r| Some(r.price)),
        Arc::new(Int64Array::from(rows.iter().map(|r| r.model_year).collect::<Vec<_>>())),
        text(|r| Some(r.model.as_str())),
        text(|r| Some(r.condition.as_str())),
        float(|r| r.cylinders),
        text(|r| Some(r.fuel.as_str())),
        float(|r| r.odometer),
        text(|r| Some(r.transmission.as_str())),
        text(|r| Some(r.vehicle_type.as_str())),
        text(|r| r.paint_color.as_deref()),
        float(|r| r.is_4wd),
        text(|r| Some(r.date_posted.as_str())),
        Arc::new(Int64Array::from(rows.iter().map(|r| r.days_listed).collect::<Vec<_>>())),
    ];

    let batch = RecordBatch::try_new(schema.clone(), columns).expect("Failed to create RecordBatch");
    let file = std::fs::File::create(path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");
}

fn main() {
    let mut rng = SimpleRng::new(42);
    let rows = generate(&mut rng, 2_000);

    let csv_path = "vehicles_sample.csv";
    let mut writer = csv::Writer::from_path(csv_path).expect("Failed to create CSV file");
    for row in &rows {
        writer.serialize(row).expect("Failed to write CSV row");
    }
    writer.flush().expect("Failed to flush CSV file");

    let parquet_path = "vehicles_sample.parquet";
    write_parquet(&rows, parquet_path);

    println!("Wrote {} listings to {csv_path} and {parquet_path}", rows.len());
}
