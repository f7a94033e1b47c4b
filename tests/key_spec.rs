use sdmx_reader::sdmx::models::Meta;
use sdmx_reader::{DataFilter, DataQuery, Detail, Key, LanguagePriorityList, Obs, ResourceRef, SdmxError, Series};

fn obs(period: &str, value: Option<f64>, status: Option<&str>) -> Obs {
    let mut meta = Meta::new();
    if let Some(status) = status {
        meta.insert("OBS_STATUS".to_string(), status.to_string());
    }
    Obs {
        period: period.to_string(),
        value,
        meta,
    }
}

fn sample_series(key: &str) -> Series {
    let mut meta = Meta::new();
    meta.insert("TITLE".to_string(), format!("Series {}", key));
    Series::new(
        Key::parse(key),
        meta,
        vec![
            obs("2002", Some(2.0), Some("A")),
            obs("2001", None, Some("E")),
            obs("2003", Some(3.0), None),
        ],
    )
}

#[test]
fn parse_and_display_agree() {
    for text in ["A.BE.EUR", "A..EUR", "M.BE+FR.", "all"] {
        assert_eq!(Key::parse(text).to_string(), text);
    }
    assert_eq!(Key::parse("A.*.EUR").to_string(), "A..EUR");
    assert_eq!(Key::parse(" all "), Key::ALL);
    assert_eq!("A.BE".parse::<Key>().unwrap(), Key::of(["A", "BE"]));
    assert_eq!(Key::of(Vec::<String>::new()), Key::ALL);
}

#[test]
fn key_accessors() {
    let key = Key::parse("A..BE+FR");
    assert_eq!(key.size(), 3);
    assert_eq!(&key[0], "A");
    assert_eq!(key.get(3), None);
    assert!(key.is_wildcard(1));
    assert!(!key.is_wildcard(0));
    assert!(key.is_multi_value(2));
    assert!(!key.is_series());
    assert!(Key::parse("A.BE.EUR").is_series());
    assert!(!Key::ALL.is_series());
    assert!(Key::ALL.is_all());
}

#[test]
fn all_contains_everything() {
    for text in ["A.BE.EUR", "A..", "X", "all"] {
        let key = Key::parse(text);
        assert!(Key::ALL.contains(&key), "{}", text);
        assert!(key.contains(&key), "{}", text);
    }
    assert!(!Key::parse("A.BE.EUR").contains(&Key::ALL));

    // a lone wildcard is the same key as ALL
    let series = Key::parse("A.BE.EUR");
    for key in [Key::parse("*"), Key::parse(""), Key::parse(" + "), Key::of([""]), Key::of(["*"])] {
        assert_eq!(key, Key::ALL);
        assert!(key.is_all());
        assert!(key.contains(&series));
        assert_eq!(key.to_string(), "all");
    }
    let query = DataQuery::new(Key::parse("*"), Detail::Full);
    assert_eq!(query.execute(vec![sample_series("A.BE.EUR")]).count(), 1);
}

#[test]
fn containment_is_positional() {
    let wide = Key::parse("A..EUR");
    let narrow = Key::parse("A.BE.EUR");
    assert!(wide.contains(&narrow));
    assert!(!narrow.contains(&wide));
    assert!(wide.supersedes(&narrow));
    assert!(!wide.supersedes(&wide));
    assert!(Key::ALL.supersedes(&narrow));

    // different sizes never contain each other
    assert!(!Key::parse("A.").contains(&Key::parse("A.BE.EUR")));
    // multi-value codes match only the identical token
    assert!(!Key::parse("A.BE+FR.EUR").contains(&narrow));
    assert!(Key::parse("A.BE+FR.EUR").contains(&Key::parse("A.BE+FR.EUR")));
}

#[test]
fn series_observations_are_ordered() {
    let series = sample_series("A.BE.EUR");
    let periods: Vec<&str> = series.obs.iter().map(|o| o.period.as_str()).collect();
    assert_eq!(periods, vec!["2001", "2002", "2003"]);

    let tie = Series::new(
        Key::parse("A"),
        Meta::new(),
        vec![obs("2001", Some(2.0), None), obs("2001", None, None), obs("2001", Some(1.0), None)],
    );
    let values: Vec<Option<f64>> = tie.obs.iter().map(|o| o.value).collect();
    assert_eq!(values, vec![None, Some(1.0), Some(2.0)]);
}

#[test]
fn detail_truth_table() {
    let series = sample_series("A.BE.EUR");
    let cases = [
        (Detail::Full, true, true),
        (Detail::DataOnly, true, false),
        (Detail::SeriesKeysOnly, false, false),
        (Detail::NoData, false, true),
    ];
    for (detail, data, meta) in cases {
        let filter = DataFilter::new(detail);
        assert_eq!(filter.is_data_requested(), data, "{}", detail);
        assert_eq!(filter.is_meta_requested(), meta, "{}", detail);

        let projected = filter.apply(&series);
        assert_eq!(projected.key, series.key);
        assert_eq!(projected.obs.len(), if data { 3 } else { 0 }, "{}", detail);
        assert_eq!(projected.meta.is_empty(), !meta, "{}", detail);
        assert_eq!(projected.obs.iter().any(|o| !o.meta.is_empty()), data && meta, "{}", detail);
        if data {
            let values: Vec<Option<f64>> = projected.obs.iter().map(|o| o.value).collect();
            assert_eq!(values, vec![None, Some(2.0), Some(3.0)]);
        }
    }
    assert!(DataFilter::new(Detail::SeriesKeysOnly).apply(&series).is_skeleton());
    // the input is never modified
    assert_eq!(series, sample_series("A.BE.EUR"));
}

#[test]
fn detail_names() {
    assert_eq!("data_only".parse::<Detail>().unwrap(), Detail::DataOnly);
    assert_eq!("SeriesKeysOnly".parse::<Detail>().unwrap(), Detail::SeriesKeysOnly);
    assert_eq!("no-data".parse::<Detail>().unwrap(), Detail::NoData);
    assert!("everything".parse::<Detail>().is_err());
    assert_eq!(Detail::default(), Detail::Full);
    assert_eq!(DataQuery::default(), DataQuery::ALL);
}

#[test]
fn query_filters_then_projects() {
    let data = vec![sample_series("A.BE.EUR"), sample_series("A.FR.EUR"), sample_series("M.BE.EUR")];
    let query = DataQuery::new(Key::parse("A..EUR"), Detail::NoData);
    let result: Vec<Series> = query.execute(data.clone()).collect();
    let keys: Vec<String> = result.iter().map(|s| s.key.to_string()).collect();
    assert_eq!(keys, vec!["A.BE.EUR", "A.FR.EUR"]);
    assert!(result.iter().all(|s| s.obs.is_empty() && !s.meta.is_empty()));

    let unfiltered: Vec<Series> = DataQuery::ALL.execute(data.clone()).collect();
    assert_eq!(unfiltered, data);

    let fallible = vec![Ok(data[0].clone()), Err(SdmxError::CursorFailed), Ok(data[2].clone())];
    let mut results = query.execute_results(fallible);
    assert_eq!(results.next().unwrap().unwrap().key, data[0].key);
    assert!(matches!(results.next(), Some(Err(SdmxError::CursorFailed))));
    assert!(results.next().is_none());
}

#[test]
fn resource_references() {
    let full = ResourceRef::parse("ECB,EXR,1.0").unwrap();
    assert_eq!(full.to_string(), "ECB,EXR,1.0");
    let bare: ResourceRef = "EXR".parse().unwrap();
    assert_eq!(bare.to_string(), "all,EXR,latest");
    assert!(bare.contains(&full));
    assert!(!full.contains(&ResourceRef::parse("ECB,EXR,2.0").unwrap()));
    assert!(matches!(ResourceRef::parse("a,b,c,d"), Err(SdmxError::InvalidReference(_))));
    assert!(ResourceRef::parse("ECB,,1.0").is_err());
}

#[test]
fn language_priority_lists() {
    let list = LanguagePriorityList::parse("en;q=0.5, fr-BE, de;q=0, nl;q=0.8").unwrap();
    let ranges: Vec<&str> = list.ranges().iter().map(|r| r.range.as_str()).collect();
    assert_eq!(ranges, vec!["fr-be", "nl", "en"]);
    assert_eq!(list.to_string(), "fr-be,nl;q=0.8,en;q=0.5");
    assert_eq!(LanguagePriorityList::default(), LanguagePriorityList::any());

    for bad in ["", "fr;q=2", "en;x=1", "toolongsubtag", "fr_BE"] {
        assert!(
            matches!(LanguagePriorityList::parse(bad), Err(SdmxError::InvalidLanguageRange(_))),
            "{}",
            bad
        );
    }
}
