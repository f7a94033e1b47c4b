use sdmx_reader::sdmx::SeriesCursor;
use sdmx_reader::sdmx::models::Meta;
use sdmx_reader::{
    DataCursor, DataFormat, DataQuery, DataStructure, DecodeOptions, Detail, Key, ResourceRef, SdmxError, SdmxReader,
    Series, StructureFormat,
};
use std::fs;
use std::path::PathBuf;

/// The same two annual series (BE and FR against EUR, 2001..2003) in every encoding.
const DATA_FIXTURES: &[(&str, DataFormat)] = &[
    ("generic20.xml", DataFormat::GenericData20),
    ("generic21.xml", DataFormat::GenericData21),
    ("compact20.xml", DataFormat::CompactData20),
    ("compact21.xml", DataFormat::CompactData21),
];

fn fixture_path(parts: &[&str]) -> PathBuf {
    let mut p = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    for part in parts {
        p.push(part);
    }
    p
}

fn read_fixture(name: &str) -> Vec<u8> {
    let path = fixture_path(&["tests", "fixtures", name]);
    fs::read(&path).unwrap_or_else(|e| panic!("cannot read {}: {}", path.display(), e))
}

fn structure() -> DataStructure {
    let bytes = read_fixture("structure21.xml");
    let mut structures = SdmxReader::default()
        .structures(bytes.as_slice(), StructureFormat::Structure21)
        .unwrap();
    assert_eq!(structures.len(), 1);
    structures.remove(0)
}

fn read_all(name: &str, format: DataFormat, structure: &DataStructure) -> Vec<Series> {
    let bytes = read_fixture(name);
    let cursor = SdmxReader::default().data_cursor(bytes.as_slice(), format, structure);
    cursor
        .into_series()
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|e| panic!("{} failed to decode: {}", name, e))
}

fn meta(pairs: &[(&str, &str)]) -> Meta {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn every_encoding_decodes_to_the_same_series() {
    let structure = structure();
    let reference = read_all("generic21.xml", DataFormat::GenericData21, &structure);
    for (name, format) in DATA_FIXTURES {
        let series = read_all(name, *format, &structure);
        assert_eq!(series, reference, "{} differs from generic21.xml", name);
    }
}

#[test]
fn decoded_content_matches_the_message() {
    let structure = structure();
    let series = read_all("compact21.xml", DataFormat::CompactData21, &structure);
    assert_eq!(series.len(), 2);

    let be = &series[0];
    assert_eq!(be.key, Key::parse("A.BE.EUR"));
    assert_eq!(be.meta, meta(&[("TITLE", "Belgium, euro")]));
    let periods: Vec<&str> = be.obs.iter().map(|o| o.period.as_str()).collect();
    assert_eq!(periods, vec!["2001", "2002", "2003"]);
    assert_eq!(be.obs[0].value, Some(1.5));
    assert_eq!(be.obs[1].meta, meta(&[("OBS_STATUS", "A")]));
    assert_eq!(be.obs[2].value, None, "NaN is an absent value");
    assert_eq!(be.obs[2].meta, meta(&[("OBS_STATUS", "E")]));

    let fr = &series[1];
    assert_eq!(fr.key.to_string(), "A.FR.EUR");
    let values: Vec<Option<f64>> = fr.obs.iter().map(|o| o.value).collect();
    assert_eq!(values, vec![Some(10.0), Some(20.0), Some(30.0)]);
    assert!(fr.obs.iter().all(|o| o.meta.is_empty()));
}

#[test]
fn cached_series_replay_through_a_cursor() {
    let structure = structure();
    let decoded = read_all("generic20.xml", DataFormat::GenericData20, &structure);
    let replayed: Vec<Series> = SeriesCursor::new(decoded.clone())
        .into_series()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(replayed, decoded);
}

#[test]
fn cursor_walks_series_then_observations() {
    let structure = structure();
    for (name, format) in DATA_FIXTURES {
        let bytes = read_fixture(name);
        let mut cursor = SdmxReader::default().data_cursor(bytes.as_slice(), *format, &structure);

        assert!(cursor.series_key().unwrap_err().is_illegal_state(), "{}", name);
        assert!(cursor.next_obs().unwrap_err().is_illegal_state(), "{}", name);

        let mut series_count = 0;
        let mut obs_count = 0;
        while cursor.next_series().unwrap() {
            series_count += 1;
            assert!(cursor.series_key().unwrap().is_series());
            assert!(cursor.obs_period().unwrap_err().is_illegal_state());
            while cursor.next_obs().unwrap() {
                obs_count += 1;
                assert!(!cursor.obs_period().unwrap().is_empty());
            }
            // end of series is sticky and keeps the key available
            assert!(!cursor.next_obs().unwrap());
            assert!(cursor.series_key().is_ok());
            assert!(cursor.obs_value().unwrap_err().is_illegal_state());
        }
        assert_eq!((series_count, obs_count), (2, 6), "{}", name);
        assert!(!cursor.next_series().unwrap());
        assert!(!cursor.next_obs().unwrap());

        cursor.close().unwrap();
        cursor.close().unwrap();
        assert!(cursor.is_closed());
        assert!(matches!(cursor.next_series(), Err(SdmxError::CursorClosed)));
        assert!(matches!(cursor.series_key(), Err(SdmxError::CursorClosed)));
    }
}

#[test]
fn skipping_observations_moves_to_the_next_series() {
    let structure = structure();
    for (name, format) in DATA_FIXTURES {
        let bytes = read_fixture(name);
        let mut cursor = SdmxReader::default().data_cursor(bytes.as_slice(), *format, &structure);

        assert!(cursor.next_series().unwrap());
        assert!(cursor.next_obs().unwrap());
        assert_eq!(cursor.obs_period().unwrap(), "2001");

        // leave the first series in the middle of its observations
        assert!(cursor.next_series().unwrap(), "{}", name);
        assert_eq!(cursor.series_key().unwrap().to_string(), "A.FR.EUR");
        assert_eq!(cursor.series_attributes().unwrap(), &meta(&[("TITLE", "France, euro")]));
        assert!(cursor.next_obs().unwrap());
        assert_eq!(cursor.obs_value().unwrap(), Some(10.0));
        assert!(!cursor.next_series().unwrap());
    }
}

#[test]
fn close_releases_the_cursor_mid_stream() {
    let structure = structure();
    let bytes = read_fixture("generic20.xml");
    let mut cursor = SdmxReader::default().boxed_cursor(bytes.as_slice(), DataFormat::GenericData20, &structure);
    assert!(cursor.next_series().unwrap());
    cursor.close().unwrap();
    assert!(matches!(cursor.next_obs(), Err(SdmxError::CursorClosed)));
}

#[test]
fn detail_projection_over_a_cursor() {
    let structure = structure();
    let bytes = read_fixture("generic21.xml");
    let reader = SdmxReader::default();

    let cases = [
        (Detail::Full, true, true),
        (Detail::DataOnly, true, false),
        (Detail::SeriesKeysOnly, false, false),
        (Detail::NoData, false, true),
    ];
    for (detail, has_obs, has_meta) in cases {
        let query = DataQuery::new(Key::ALL, detail);
        let cursor = reader.data_cursor(bytes.as_slice(), DataFormat::GenericData21, &structure);
        let series: Vec<Series> = query
            .execute_results(cursor.into_series())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(series.len(), 2);
        let be = &series[0];
        assert_eq!(!be.obs.is_empty(), has_obs, "{}", detail);
        assert_eq!(!be.meta.is_empty(), has_meta, "{}", detail);
        if has_obs {
            assert_eq!(be.obs[0].meta.is_empty(), !has_meta, "{}", detail);
        }
    }
}

#[test]
fn lazy_and_eager_filtering_agree() {
    let structure = structure();
    let bytes = read_fixture("compact20.xml");
    let reader = SdmxReader::default();
    let flow = ResourceRef::of(Some("ECB"), "EXR", Some("1.0"));

    let all = reader
        .data_set(bytes.as_slice(), DataFormat::CompactData20, &structure, flow.clone(), &DataQuery::ALL)
        .unwrap();
    assert_eq!(all.data.len(), 2);

    for key in ["all", "A.BE.EUR", "A..EUR", ".FR.", "M..", "A.BE+FR.EUR"] {
        let query = DataQuery::new(Key::parse(key), Detail::DataOnly);
        let lazy: Vec<Series> = query
            .execute_results(
                reader
                    .data_cursor(bytes.as_slice(), DataFormat::CompactData20, &structure)
                    .into_series(),
            )
            .collect::<Result<_, _>>()
            .unwrap();
        let eager = all.get_data(&query);
        let streamed = reader
            .data_set(bytes.as_slice(), DataFormat::CompactData20, &structure, flow.clone(), &query)
            .unwrap();
        assert_eq!(lazy, eager, "key {}", key);
        assert_eq!(streamed.data, eager, "key {}", key);
        assert_eq!(streamed.query, query);
    }

    let matched = |key: &str| all.get_data(&DataQuery::new(Key::parse(key), Detail::Full)).len();
    assert_eq!(matched("A..EUR"), 2);
    assert_eq!(matched(".FR."), 1);
    assert_eq!(matched("M.."), 0);
    // multi-value codes are compared literally
    assert_eq!(matched("A.BE+FR.EUR"), 0);
}

#[test]
fn wildcard_series_key_is_rejected() {
    let structure = structure();
    let xml = r#"<CompactData><DataSet>
        <Series FREQ="A" CURRENCY="EUR"><Obs TIME_PERIOD="2001" OBS_VALUE="1"/></Series>
    </DataSet></CompactData>"#;
    let mut cursor = SdmxReader::default().data_cursor(xml.as_bytes(), DataFormat::CompactData20, &structure);
    let err = cursor.next_series().unwrap_err();
    assert!(matches!(err, SdmxError::InvalidSeriesKey(ref key) if key == "A..EUR"), "{}", err);
    assert!(err.is_decode_error());
    // the failure is final
    assert!(matches!(cursor.next_series(), Err(SdmxError::CursorFailed)));
    assert!(cursor.close().is_ok());
}

#[test]
fn truncated_message_fails_the_iterator() {
    let structure = structure();
    let bytes = read_fixture("generic21.xml");
    let cut = bytes.len() * 2 / 3;
    let cursor = SdmxReader::default().data_cursor(&bytes[..cut], DataFormat::GenericData21, &structure);

    let results: Vec<_> = cursor.into_series().collect();
    let last = results.last().unwrap();
    assert!(last.as_ref().unwrap_err().is_decode_error());
    assert!(results[..results.len() - 1].iter().all(Result::is_ok));
}

#[test]
fn observation_without_period_is_a_decode_error() {
    let structure = structure();
    let xml = r#"<GenericData><DataSet><Series>
        <SeriesKey><Value id="FREQ" value="A"/><Value id="REF_AREA" value="BE"/><Value id="CURRENCY" value="EUR"/></SeriesKey>
        <Obs><ObsValue value="1.0"/></Obs>
    </Series></DataSet></GenericData>"#;
    let mut cursor = SdmxReader::default().data_cursor(xml.as_bytes(), DataFormat::GenericData21, &structure);
    assert!(cursor.next_series().unwrap());
    let err = cursor.next_obs().unwrap_err();
    assert!(matches!(err, SdmxError::MissingElement { element: "ObsDimension", .. }), "{}", err);
}

#[test]
fn message_without_data_set_is_empty() {
    let structure = structure();
    let xml = r#"<?xml version="1.0"?><GenericData><Header><ID>EMPTY</ID></Header></GenericData>"#;
    let mut cursor = SdmxReader::default().data_cursor(xml.as_bytes(), DataFormat::GenericData21, &structure);
    assert!(!cursor.next_series().unwrap());
    assert!(!cursor.next_series().unwrap());
}

#[test]
fn latin1_message_is_transcoded() {
    let structure = structure();
    let mut bytes = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<CompactData><DataSet>".to_vec();
    bytes.extend_from_slice(b"<Series FREQ=\"A\" REF_AREA=\"BE\" CURRENCY=\"EUR\" TITLE=\"Belgi\xeb\">");
    bytes.extend_from_slice(b"<Obs TIME_PERIOD=\"2001\" OBS_VALUE=\"1\"/></Series></DataSet></CompactData>");

    let reader = SdmxReader::default();
    let series: Vec<Series> = reader
        .data_cursor_from_bytes(&bytes, DataFormat::CompactData20, &structure)
        .into_series()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(series[0].meta.get("TITLE").map(String::as_str), Some("België"));

    // an explicit label takes precedence over the declaration
    let forced = SdmxReader::new(DecodeOptions {
        encoding: Some("utf-8".to_string()),
        ..Default::default()
    });
    let series: Vec<Series> = forced
        .data_cursor_from_bytes(&bytes, DataFormat::CompactData20, &structure)
        .into_series()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(series[0].meta.get("TITLE").map(String::as_str), Some("Belgi\u{FFFD}"));
}
