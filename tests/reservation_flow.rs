use reservation_form::{
    HOTEL_ERROR, Harness, ROOM_COUNT_ERROR, ROOM_TYPE_ERROR, Result, error_list_html,
};

const RESERVATION_PAGE_HTML: &str = r#"
    <h1>Réservation d'hôtel</h1>
    <div id="message" style="display: none"></div>
    <form>
      <select id="lis_hotel">
        <option value="0">-- Choisissez un hôtel --</option>
        <option value="grand">Grand Hôtel</option>
        <option value="bellevue">Hôtel Bellevue</option>
        <option value="lac">Auberge du Lac</option>
      </select>
      <input id="txt_nbrChambre" type="text">
      <input id="rad_simple" type="radio" name="opt_type_chambre" value="simple">
      <input id="rad_double" type="radio" name="opt_type_chambre" value="double">
      <input id="rad_suite" type="radio" name="opt_type_chambre" value="suite">
      <input id="chk_wifi" type="checkbox" name="chk_options[]" value="wifi">
      <input id="chk_parking" type="checkbox" name="chk_options[]" value="parking">
      <input id="chk_piscine" type="checkbox" name="chk_options[]" value="piscine">
      <button id="btn_reserver" type="submit">Réserver</button>
      <button id="btn_effacer" type="reset">Effacer</button>
    </form>
    <div id="reservation" style="display: none">
      <h2></h2>
      <p>Chambres : <span id="chambre_nombre"></span></p>
      <p>Type : <span id="chambre_type"></span></p>
      <ul id="options"></ul>
      <img src="">
    </div>
"#;

fn fill_valid(page: &mut Harness) -> Result<()> {
    page.select_option("#lis_hotel", "grand")?;
    page.type_text("#txt_nbrChambre", "5")?;
    page.set_checked("#rad_suite", true)?;
    Ok(())
}

#[test]
fn valid_reservation_shows_confirmation() -> Result<()> {
    let mut page = Harness::from_html(RESERVATION_PAGE_HTML)?;
    fill_valid(&mut page)?;
    page.set_checked("#chk_wifi", true)?;

    page.submit("form")?;

    page.assert_style("#reservation", "display", "block")?;
    page.assert_text("#reservation h2", "grand")?;
    page.assert_text("#chambre_nombre", "5")?;
    page.assert_text("#chambre_type", "suite")?;
    page.assert_attr("#reservation img", "src", "./images/grand.jpg")?;
    assert_eq!(page.inner_html_of("#options")?, "<li>wifi</li>");
    // The error panel was never shown.
    page.assert_style("#message", "display", "none")?;
    Ok(())
}

#[test]
fn empty_submission_lists_all_three_errors() -> Result<()> {
    let mut page = Harness::from_html(RESERVATION_PAGE_HTML)?;
    page.type_text("#txt_nbrChambre", "abc")?;

    page.submit("form")?;

    page.assert_style("#message", "display", "block")?;
    assert_eq!(
        page.inner_html_of("#message")?,
        error_list_html(&[HOTEL_ERROR, ROOM_COUNT_ERROR, ROOM_TYPE_ERROR])
    );
    page.assert_style("#reservation", "display", "none")?;
    Ok(())
}

#[test]
fn out_of_range_count_is_the_only_error() -> Result<()> {
    for raw in ["0", "13"] {
        let mut page = Harness::from_html(RESERVATION_PAGE_HTML)?;
        fill_valid(&mut page)?;
        page.type_text("#txt_nbrChambre", raw)?;

        page.submit("form")?;

        assert_eq!(
            page.inner_html_of("#message")?,
            error_list_html(&[ROOM_COUNT_ERROR]),
            "room count {raw:?}"
        );
        page.assert_style("#message", "display", "block")?;
    }
    Ok(())
}

#[test]
fn every_room_count_in_range_passes() -> Result<()> {
    let mut page = Harness::from_html(RESERVATION_PAGE_HTML)?;
    fill_valid(&mut page)?;
    for count in 1..=12 {
        page.type_text("#txt_nbrChambre", &count.to_string())?;
        assert_eq!(page.validate()?, Vec::<&str>::new(), "count {count}");
    }
    Ok(())
}

#[test]
fn submit_button_click_behaves_like_form_submit() -> Result<()> {
    let mut page = Harness::from_html(RESERVATION_PAGE_HTML)?;
    fill_valid(&mut page)?;
    page.click("#btn_reserver")?;
    page.assert_style("#reservation", "display", "block")?;
    Ok(())
}

#[test]
fn reset_hides_error_panel_after_failed_submit() -> Result<()> {
    let mut page = Harness::from_html(RESERVATION_PAGE_HTML)?;
    page.submit("form")?;
    page.assert_style("#message", "display", "block")?;

    page.click("#btn_effacer")?;
    page.assert_style("#message", "display", "none")?;
    page.assert_style("#reservation", "display", "none")?;
    Ok(())
}

#[test]
fn reset_hides_confirmation_panel_after_successful_submit() -> Result<()> {
    let mut page = Harness::from_html(RESERVATION_PAGE_HTML)?;
    fill_valid(&mut page)?;
    page.submit("form")?;
    page.assert_style("#reservation", "display", "block")?;

    page.reset("form")?;
    page.assert_style("#reservation", "display", "none")?;
    page.assert_style("#message", "display", "none")?;
    Ok(())
}

#[test]
fn failed_submit_after_success_keeps_confirmation_visible() -> Result<()> {
    let mut page = Harness::from_html(RESERVATION_PAGE_HTML)?;
    fill_valid(&mut page)?;
    page.submit("form")?;
    page.assert_style("#reservation", "display", "block")?;

    // Break one field and submit again: the error panel shows, the
    // confirmation panel is left untouched.
    page.select_option("#lis_hotel", "0")?;
    page.submit("form")?;

    page.assert_style("#message", "display", "block")?;
    assert_eq!(
        page.inner_html_of("#message")?,
        error_list_html(&[HOTEL_ERROR])
    );
    page.assert_style("#reservation", "display", "block")?;
    Ok(())
}

#[test]
fn selection_reflects_field_state_in_document_order() -> Result<()> {
    let mut page = Harness::from_html(RESERVATION_PAGE_HTML)?;
    page.select_option("#lis_hotel", "bellevue")?;
    page.type_text("#txt_nbrChambre", "2")?;
    page.set_checked("#rad_double", true)?;
    page.set_checked("#chk_piscine", true)?;
    page.set_checked("#chk_wifi", true)?;

    let selection = page.selection()?;
    assert_eq!(selection.hotel, "bellevue");
    assert_eq!(selection.room_count, 2.0);
    assert_eq!(selection.room_type, "double");
    assert_eq!(
        selection.options,
        vec!["wifi".to_string(), "piscine".to_string()]
    );
    Ok(())
}

#[test]
fn choosing_another_radio_replaces_the_room_type() -> Result<()> {
    let mut page = Harness::from_html(RESERVATION_PAGE_HTML)?;
    fill_valid(&mut page)?;
    page.set_checked("#rad_simple", true)?;
    page.submit("form")?;
    page.assert_text("#chambre_type", "simple")?;
    Ok(())
}

#[test]
fn image_path_tracks_the_selected_hotel() -> Result<()> {
    let mut page = Harness::from_html(RESERVATION_PAGE_HTML)?;
    fill_valid(&mut page)?;
    page.submit("form")?;
    page.assert_attr("#reservation img", "src", "./images/grand.jpg")?;

    page.select_option("#lis_hotel", "lac")?;
    page.submit("form")?;
    page.assert_attr("#reservation img", "src", "./images/lac.jpg")?;
    Ok(())
}
