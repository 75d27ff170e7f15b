use gloo::timers::callback::Timeout;
use gloo::utils::{document, window};
use log::debug;
use wasm_bindgen::JsCast;
use web_sys::Element;

pub const HIGHLIGHT_CLASS: &str = "highlight-animation";
pub const DEFAULT_HIGHLIGHT_MS: u32 = 2000;

pub fn element_by_id(id: &str) -> Option<Element> {
    document().get_element_by_id(id)
}

/// Flashes `element` for `duration` milliseconds.
pub fn highlight(element: &Element, duration: u32) {
    let _ = element.class_list().add_1(HIGHLIGHT_CLASS);
    let element = element.clone();
    Timeout::new(duration, move || {
        let _ = element.class_list().remove_1(HIGHLIGHT_CLASS);
    })
    .forget();
}

pub fn is_current_page(href: Option<&str>, pathname: &str) -> bool {
    href == Some(pathname)
}

/// Marks the navigation link pointing at the current page as active.
pub fn activate_nav_links() {
    let Ok(pathname) = window().location().pathname() else {
        return;
    };
    let Ok(links) = document().query_selector_all(".navbar-nav .nav-link") else {
        return;
    };

    for i in 0..links.length() {
        let Some(link) = links.get(i).and_then(|node| node.dyn_into::<Element>().ok()) else {
            continue;
        };
        if is_current_page(link.get_attribute("href").as_deref(), &pathname) {
            debug!("Active nav link: {}", pathname);
            let _ = link.class_list().add_1("active");
        }
    }
}
