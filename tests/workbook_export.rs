use playbook::play::{PlayRecord, Situation, TaggedPlay};
use playbook::recommend;
use playbook::sheet::load_workbook;
use playbook::workbook_export::{export_dataset, export_suggestions, write_template};
use playbook::Normalizer;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

#[test]
fn template_normalizes_as_canonical_sheet() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("template.xlsx");
    write_template(&path).expect("write template");

    let workbook = load_workbook(&path).expect("template loads");
    assert_eq!(workbook.sheet_names(), vec!["MatchData", "Explanation"]);
    let data = workbook.entries[0].sheet.as_ref().expect("data sheet");
    assert_eq!(data.headers.len(), 16);
    assert_eq!(data.len(), 3);

    let mut log = Vec::new();
    let out = Normalizer::new()
        .normalize_sheet(data, &mut log)
        .expect("normalizes");
    assert_eq!(out.plays.len(), 3);
    let slant = &out.plays[1];
    assert_eq!(slant.play_type, "Pass");
    assert_eq!(slant.pass_course, "Slant");
    assert_eq!(slant.down, 2);
    assert_eq!(slant.distance, 6);
    assert_eq!(slant.field_position, "45");
    assert_eq!(slant.yards_gained, 8.0);
    // No Detail column: Result and Memo carry the play notes.
    assert_eq!(slant.detail, "First Down; Quick slant");
    assert_eq!(out.plays[0].detail, "Power run");
    assert!(log.iter().any(|l| l.contains("Detail <- [\"Result\", \"Memo\"]")));

    let help = workbook.entries[1].sheet.as_ref().expect("explanation sheet");
    assert_eq!(help.headers, vec!["Column", "Description"]);
    assert_eq!(help.len(), 16);
}

#[test]
fn dataset_export_round_trips_through_reader() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("plays.xlsx");
    let mut play = PlayRecord::new("2025-01-01", "Pass");
    play.quarter = "2Q".to_string();
    play.down = 3;
    play.distance = 7;
    play.field_position = "Own 30".to_string();
    play.pass_course = "Out".to_string();
    play.yards_gained = 9.0;
    play.success = 1;
    let rows = vec![TaggedPlay {
        team: "Falcons".to_string(),
        play: play.clone(),
    }];
    assert_eq!(export_dataset(&path, &rows).expect("export"), 1);

    let workbook = load_workbook(&path).expect("export loads");
    let sheet = workbook.entries[0].sheet.as_ref().expect("plays sheet");
    assert_eq!(sheet.headers.last().map(String::as_str), Some("Team"));
    let out = Normalizer::new()
        .normalize_sheet(sheet, &mut Vec::new())
        .expect("normalizes");
    assert_eq!(out.plays, vec![play]);
}

#[test]
fn suggestions_export_writes_both_sheets() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("suggestions.xlsx");
    let mut play = PlayRecord::new("2025-01-01", "Run");
    play.run_course = "Inside".to_string();
    play.field_position = "88".to_string();
    play.yards_gained = 4.0;
    let situation = Situation {
        down: Some(1),
        field_position: Some(85),
        score_diff: Some(-3),
        ..Situation::default()
    };
    let suggestions = recommend(&[play], &situation);
    assert_eq!(suggestions.len(), 1);
    export_suggestions(&path, &situation, &suggestions).expect("export");

    let workbook = load_workbook(&path).expect("export loads");
    assert_eq!(workbook.sheet_names(), vec!["Suggestions", "Situation"]);
    let ranked = workbook.entries[0].sheet.as_ref().expect("suggestions sheet");
    assert_eq!(ranked.cell(0, 0), "1");
    assert_eq!(ranked.cell(0, 1), "Run - Inside");
    assert_eq!(ranked.cell(0, 2), "4");
    assert_eq!(ranked.cell(0, 3), "0%");

    let situation_sheet = workbook.entries[1].sheet.as_ref().expect("situation sheet");
    assert_eq!(situation_sheet.cell(0, 1), "1");
    assert_eq!(situation_sheet.cell(2, 1), "Opp 15 (red zone)");
    assert_eq!(situation_sheet.cell(4, 1), "-3");
}

#[test]
fn date_formatted_cells_read_back_as_calendar_dates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("dated.xlsx");

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Week1").expect("sheet name");
        for (col, header) in ["Date", "PlayType", "YardsGained"].iter().enumerate() {
            sheet.write_string(0, col as u16, *header).expect("header");
        }
        let kickoff = ExcelDateTime::from_ymd(2024, 9, 1).expect("valid date");
        sheet
            .write_datetime_with_format(1, 0, &kickoff, &Format::new().set_num_format("yyyy-mm-dd"))
            .expect("date cell");
        sheet.write_string(1, 1, "Pass").expect("play type");
        sheet.write_number(1, 2, 7.0).expect("yards");

        let late = ExcelDateTime::from_ymd(2024, 9, 1)
            .and_then(|d| d.and_hms(14, 30, 0))
            .expect("valid datetime");
        sheet
            .write_datetime_with_format(
                2,
                0,
                &late,
                &Format::new().set_num_format("yyyy-mm-dd hh:mm:ss"),
            )
            .expect("datetime cell");
        sheet.write_string(2, 1, "Run").expect("play type");
        sheet.write_number(2, 2, 3.0).expect("yards");
    }
    workbook.save(&path).expect("save workbook");

    let loaded = load_workbook(&path).expect("workbook loads");
    let plays = Normalizer::new()
        .with_today("2025-03-01")
        .normalize_workbook(&loaded)
        .plays
        .expect("plays");
    assert_eq!(plays.len(), 2);
    assert_eq!(plays[0].play.date, "2024-09-01");
    assert_eq!(plays[1].play.date, "2024-09-01 14:30:00");
}
