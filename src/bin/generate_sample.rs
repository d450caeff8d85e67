//! Writes `sample_assessments.txt`, a synthetic report in the OSPI
//! tab-separated layout, for trying the viewer without network access.

const DISTRICTS: [(&str, &[&str]); 3] = [
    (
        "Seattle School District No. 1",
        &["Lincoln Elementary", "Adams Elementary", "Whitman Middle School"],
    ),
    ("Tacoma School District", &["Lincoln Elementary", "Stadium High School"]),
    ("Spokane School District", &["Roosevelt Elementary", "Garfield Elementary"]),
];

const GRADES: [&str; 8] = ["3rd", "4th", "5th", "6th", "7th", "8th", "10th", "11th"];
const SUBJECTS: [&str; 3] = ["MATH", "Math", "ELA"];

/// (group, offset from the school mean, share of schools where suppressed)
const GROUPS: [(&str, f64, f64); 3] = [
    ("All Students", 0.0, 0.0),
    ("Low Income", -14.0, 0.15),
    ("Non Low Income", 8.0, 0.1),
];

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

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn percent(v: f64) -> String {
    format!("{:.1}%", v.clamp(0.0, 100.0))
}

fn main() {
    let mut rng = SimpleRng::new(42);
    let output_path = "sample_assessments.txt";

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(output_path)
        .expect("Failed to create output file");

    writer
        .write_record([
            "SchoolYear",
            "District",
            "School",
            "testAdministration",
            "GradeLevel",
            "Subject",
            "StudentGroup",
            "Count of Students Expected to Test",
            "PercentMetStandard",
            "PercentLevel4",
        ])
        .expect("Failed to write header");

    let mut rows = 0usize;
    for (district, schools) in DISTRICTS {
        for &school in schools {
            let school_mean = rng.gauss(55.0, 12.0);

            for grade in GRADES {
                for subject in SUBJECTS {
                    // Only the 10th/11th grade cohort sat the second math test.
                    if subject == "Math" && !matches!(grade, "10th" | "11th") {
                        continue;
                    }
                    for administration in ["SBA", "WCAS"] {
                        for (group, offset, suppressed) in GROUPS {
                            let count = rng.gauss(80.0, 25.0).max(4.0).round() as u32;
                            let (met, level4) = if count < 10 || rng.next_f64() < suppressed {
                                ("N<10".to_string(), "N<10".to_string())
                            } else {
                                let met = rng.gauss(school_mean + offset, 6.0);
                                (percent(met), percent(met * rng.gauss(0.45, 0.05)))
                            };
                            let count = count.to_string();

                            writer
                                .write_record([
                                    "2017-18",
                                    district,
                                    school,
                                    administration,
                                    grade,
                                    subject,
                                    group,
                                    count.as_str(),
                                    met.as_str(),
                                    level4.as_str(),
                                ])
                                .expect("Failed to write row");
                            rows += 1;
                        }
                    }
                }
            }
        }
    }

    writer.flush().expect("Failed to flush output");
    println!("Wrote {rows} report rows to {output_path}");
}
