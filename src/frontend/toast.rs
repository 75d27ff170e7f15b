use yew::prelude::*;

/// How long a notification stays on screen
pub const TOAST_DELAY_MS: u32 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Warning,
    Danger,
}

impl ToastKind {
    pub fn class(self) -> String {
        let name = match self {
            ToastKind::Info => "info",
            ToastKind::Success => "success",
            ToastKind::Warning => "warning",
            ToastKind::Danger => "danger",
        };
        format!("toast align-items-center text-white bg-{} border-0 show", name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: u32,
    pub message: String,
    pub kind: ToastKind,
}

#[derive(Properties, PartialEq)]
pub struct Props {
    pub toasts: Vec<Toast>,
    pub ondismiss: Callback<u32>,
}

#[function_component(ToastStack)]
pub fn toast_stack(props: &Props) -> Html {
    if props.toasts.is_empty() {
        return html! {};
    }

    html! {
        <div class="toast-container position-fixed top-0 end-0 p-3">
            { for props.toasts.iter().map(|toast| {
                let ondismiss = props.ondismiss.clone();
                let id = toast.id;
                html! {
                    <div key={id} class={toast.kind.class()} role="alert"
                        aria-live="assertive" aria-atomic="true">
                        <div class="d-flex">
                            <div class="toast-body">{ &toast.message }</div>
                            <button type="button" class="btn-close btn-close-white me-2 m-auto"
                                aria-label="Close" onclick={move |_| ondismiss.emit(id)}></button>
                        </div>
                    </div>
                }
            }) }
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn test_toast_kind_class() {
        assert_eq!(
            ToastKind::Danger.class(),
            "toast align-items-center text-white bg-danger border-0 show"
        );
        assert!(ToastKind::Info.class().contains("bg-info"));
    }
}
