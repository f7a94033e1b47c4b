use sdmx_reader::{
    DataCursor, DataFormat, DataQuery, DecodeOptions, Detail, Key, LanguagePriorityList, SdmxReader, StructureFormat,
};
use std::env;
use std::fs;
use std::process;

fn usage(program: &str) -> ! {
    eprintln!(
        "Usage: {} <structure.xml> <data.xml> [--format generic20|generic21|compact20|compact21] \
         [--key KEY] [--detail full|dataonly|serieskeysonly|nodata] [--lang RANGES] [--encoding LABEL]",
        program
    );
    process::exit(1);
}

fn fail(message: &str, error: impl std::fmt::Display) -> ! {
    eprintln!("ERROR: {}", message);
    eprintln!("  {}", error);
    process::exit(1);
}

/// Value following `flag`, if the flag is present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let index = args.iter().position(|arg| arg == flag)?;
    match args.get(index + 1) {
        Some(value) => Some(value.as_str()),
        None => {
            eprintln!("ERROR: {} flag requires an argument.", flag);
            process::exit(1);
        }
    }
}

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        usage(&args[0]);
    }
    let structure_path = &args[1];
    let data_path = &args[2];

    let format = match flag_value(&args, "--format").unwrap_or("generic21").parse::<DataFormat>() {
        Ok(format) => format,
        Err(e) => fail("Invalid --format", e),
    };
    let key = Key::parse(flag_value(&args, "--key").unwrap_or("all"));
    let detail = match flag_value(&args, "--detail").unwrap_or("full").parse::<Detail>() {
        Ok(detail) => detail,
        Err(e) => fail("Invalid --detail", e),
    };
    let languages = match flag_value(&args, "--lang").map(LanguagePriorityList::parse) {
        None => LanguagePriorityList::any(),
        Some(Ok(languages)) => languages,
        Some(Err(e)) => fail("Invalid --lang", e),
    };
    let structure_format = match format {
        DataFormat::GenericData20 | DataFormat::CompactData20 => StructureFormat::Structure20,
        DataFormat::GenericData21 | DataFormat::CompactData21 => StructureFormat::Structure21,
    };

    let reader = SdmxReader::new(DecodeOptions {
        languages,
        encoding: flag_value(&args, "--encoding").map(str::to_string),
    });

    let structure_bytes = fs::read(structure_path).unwrap_or_else(|e| fail("Failed to read structure file", e));
    let structures = reader
        .structures_from_bytes(&structure_bytes, structure_format)
        .unwrap_or_else(|e| fail("Failed to decode structure message", e));
    let Some(structure) = structures.first() else {
        fail("Structure message has no data structure", structure_path);
    };

    println!("Data structure: {} ({})", structure.label(), structure.reference());
    for dimension in structure.dimensions() {
        println!(
            "  {}. {} - {} [{} codes]",
            dimension.position,
            dimension.id,
            dimension.label,
            dimension.codelist.codes.len()
        );
    }
    if let Some(invalid) = key.validate_on(structure) {
        fail("Key does not fit the data structure", invalid);
    }
    println!("{}", "=".repeat(60));

    let data_bytes = fs::read(data_path).unwrap_or_else(|e| fail("Failed to read data file", e));
    let cursor = reader.data_cursor_from_bytes(&data_bytes, format, structure);
    let query = DataQuery::new(key, detail);

    let mut count = 0;
    for series in query.execute_results(cursor.into_series()) {
        let series = series.unwrap_or_else(|e| fail("Failed to decode data message", e));
        count += 1;
        println!("{}", series.key);
        for (id, value) in &series.meta {
            println!("  @{} = {}", id, value);
        }
        for obs in &series.obs {
            let value = obs.value.map_or_else(|| "-".to_string(), |v| v.to_string());
            if obs.meta.is_empty() {
                println!("  {}\t{}", obs.period, value);
            } else {
                let meta: Vec<String> = obs.meta.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                println!("  {}\t{}\t{}", obs.period, value, meta.join(" "));
            }
        }
    }
    println!("{}", "=".repeat(60));
    println!("{} series matched {}", count, query.key);
}
