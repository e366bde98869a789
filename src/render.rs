use serde_json::Value;

/// Turns a view name plus a context mapping into a response body. Handlers
/// never assemble markup themselves; they hand a context to this seam the
/// same way they would to a template engine.
pub trait PageRenderer: Send + Sync {
    fn render(&self, view: &str, context: &Value) -> String;
}

/// Server-side renderer that builds the handful of pages this app has out
/// of plain strings. View names follow the `app/template.html` convention.
pub struct HtmlRenderer;

impl PageRenderer for HtmlRenderer {
    fn render(&self, view: &str, context: &Value) -> String {
        match view {
            "bookings/booking_list.html" => booking_list(context),
            "bookings/booking_form.html" => booking_form(context),
            "bookings/booking_confirm_delete.html" => confirm_delete(context),
            "bookings/login.html" => login(context),
            "registration/signup.html" => signup(context),
            "bookings/slot_list.html" => slot_list(context),
            _ => {
                tracing::warn!(view = %view, "no renderer for view");
                page("Car Detailing", "", "<p>Page unavailable.</p>")
            }
        }
    }
}

pub fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn text<'a>(context: &'a Value, key: &str) -> &'a str {
    context.get(key).and_then(Value::as_str).unwrap_or("")
}

fn flag(context: &Value, key: &str) -> bool {
    context.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn items<'a>(context: &'a Value, key: &str) -> &'a [Value] {
    context
        .get(key)
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

fn page(title: &str, nav: &str, body: &str) -> String {
    let title = escape(title);
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>{title} | Car Detailing</title>\n\
         </head>\n\
         <body>\n\
         {nav}\n\
         {body}\n\
         </body>\n\
         </html>\n"
    )
}

fn nav(context: &Value) -> String {
    let username = text(context, "username");
    if username.is_empty() {
        return "<nav><a href=\"/accounts/login/\">Log in</a> | \
                <a href=\"/accounts/signup/\">Sign up</a></nav>"
            .to_string();
    }

    let slots_link = if flag(context, "is_staff") {
        "<a href=\"/slots/\">Time slots</a> | "
    } else {
        ""
    };
    let username = escape(username);
    format!(
        "<nav><a href=\"/bookings/\">Bookings</a> | \
         <a href=\"/bookings/create/\">New booking</a> | {slots_link}\
         <form method=\"post\" action=\"/accounts/logout/\" style=\"display:inline\">\
         <button type=\"submit\">Log out ({username})</button></form></nav>"
    )
}

fn errorlist(context: &Value, field: &str) -> String {
    let messages = context
        .get("errors")
        .and_then(|e| e.get(field))
        .and_then(Value::as_array);
    let Some(messages) = messages else {
        return String::new();
    };
    if messages.is_empty() {
        return String::new();
    }

    let mut out = String::from("<ul class=\"errorlist\">");
    for message in messages {
        out.push_str(&format!(
            "<li>{}</li>",
            escape(message.as_str().unwrap_or(""))
        ));
    }
    out.push_str("</ul>\n");
    out
}

fn input_field(context: &Value, field: &str, label: &str, kind: &str) -> String {
    let value = escape(text(&context["form"], field));
    let errors = errorlist(context, field);
    format!(
        "{errors}<p><label for=\"id_{field}\">{label}:</label> \
         <input type=\"{kind}\" name=\"{field}\" id=\"id_{field}\" value=\"{value}\"></p>\n"
    )
}

fn password_field(context: &Value, field: &str, label: &str) -> String {
    let errors = errorlist(context, field);
    format!(
        "{errors}<p><label for=\"id_{field}\">{label}:</label> \
         <input type=\"password\" name=\"{field}\" id=\"id_{field}\"></p>\n"
    )
}

/// A `<select>` whose options come from a context list. Each option object
/// supplies `value_key` for the value attribute and `label_key` for the
/// visible text.
fn select_field(
    context: &Value,
    field: &str,
    label: &str,
    list_key: &str,
    value_key: &str,
    label_key: &str,
) -> String {
    let current = text(&context["form"], field);
    let mut options = String::from("<option value=\"\">---------</option>");
    for item in items(context, list_key) {
        let value = text(item, value_key);
        let selected = if value == current { " selected" } else { "" };
        options.push_str(&format!(
            "<option value=\"{}\"{selected}>{}</option>",
            escape(value),
            escape(text(item, label_key))
        ));
    }

    let errors = errorlist(context, field);
    format!(
        "{errors}<p><label for=\"id_{field}\">{label}:</label> \
         <select name=\"{field}\" id=\"id_{field}\">{options}</select></p>\n"
    )
}

fn textarea_field(context: &Value, field: &str, label: &str) -> String {
    let value = escape(text(&context["form"], field));
    let errors = errorlist(context, field);
    format!(
        "{errors}<p><label for=\"id_{field}\">{label}:</label> \
         <textarea name=\"{field}\" id=\"id_{field}\" rows=\"4\">{value}</textarea></p>\n"
    )
}

// ── Views ──

fn booking_list(context: &Value) -> String {
    let is_staff = flag(context, "is_staff");
    let bookings = items(context, "bookings");

    let table = if bookings.is_empty() {
        "<p>No bookings yet.</p>".to_string()
    } else {
        let owner_header = if is_staff { "<th>Owner</th>" } else { "" };
        let mut rows = String::new();
        for b in bookings {
            let id = escape(text(b, "id"));
            let owner_cell = if is_staff {
                format!("<td>{}</td>", escape(text(b, "owner")))
            } else {
                String::new()
            };
            rows.push_str(&format!(
                "<tr><td>{date}</td><td>{slot}</td><td>{service}</td><td>{car}</td>\
                 <td>{name}</td>{owner_cell}\
                 <td><a href=\"/bookings/{id}/edit/\">Edit</a> \
                 <a href=\"/bookings/{id}/delete/\">Delete</a></td></tr>\n",
                date = escape(text(b, "preferred_date")),
                slot = escape(text(b, "slot")),
                service = escape(text(b, "service")),
                car = escape(text(b, "car_model")),
                name = escape(text(b, "customer_name")),
            ));
        }
        format!(
            "<table>\n<thead><tr><th>Date</th><th>Slot</th><th>Service</th>\
             <th>Car</th><th>Customer</th>{owner_header}<th></th></tr></thead>\n\
             <tbody>\n{rows}</tbody>\n</table>"
        )
    };

    let body = format!(
        "<h1>Bookings</h1>\n{table}\n\
         <p><a href=\"/bookings/create/\">Create Booking</a></p>"
    );
    page("Bookings", &nav(context), &body)
}

fn booking_form(context: &Value) -> String {
    let title = text(context, "title");
    let post_url = escape(text(context, "post_url"));

    let mut fields = String::new();
    fields.push_str(&input_field(context, "customer_name", "Customer name", "text"));
    fields.push_str(&input_field(context, "email", "Email", "email"));
    fields.push_str(&input_field(context, "phone", "Phone", "text"));
    fields.push_str(&input_field(context, "car_model", "Car model", "text"));
    fields.push_str(&select_field(
        context,
        "service_type",
        "Service type",
        "service_types",
        "value",
        "label",
    ));
    fields.push_str(&input_field(context, "preferred_date", "Preferred date", "date"));
    fields.push_str(&select_field(context, "slot", "Slot", "slots", "id", "display"));
    fields.push_str(&textarea_field(context, "notes", "Notes"));

    let body = format!(
        "<h1>{}</h1>\n\
         <form method=\"post\" action=\"{post_url}\">\n\
         {fields}<button type=\"submit\">Save</button>\n</form>\n\
         <p><a href=\"/bookings/\">Back to bookings</a></p>",
        escape(title)
    );
    page(title, &nav(context), &body)
}

fn confirm_delete(context: &Value) -> String {
    let booking = &context["booking"];
    let post_url = escape(text(context, "post_url"));
    let body = format!(
        "<h1>Delete booking</h1>\n\
         <p>Are you sure you want to delete the booking for {name} on {date} ({slot})?</p>\n\
         <form method=\"post\" action=\"{post_url}\">\n\
         <button type=\"submit\">Delete</button>\n</form>\n\
         <p><a href=\"/bookings/\">Cancel</a></p>",
        name = escape(text(booking, "customer_name")),
        date = escape(text(booking, "preferred_date")),
        slot = escape(text(booking, "slot")),
    );
    page("Delete booking", &nav(context), &body)
}

fn login(context: &Value) -> String {
    let error = text(context, "error");
    let error_html = if error.is_empty() {
        String::new()
    } else {
        format!(
            "<ul class=\"errorlist nonfield\"><li>{}</li></ul>\n",
            escape(error)
        )
    };
    let username = escape(text(&context["form"], "username"));
    let next = escape(text(context, "next"));

    let body = format!(
        "<h1>Log in</h1>\n{error_html}\
         <form method=\"post\" action=\"/accounts/login/\">\n\
         <p><label for=\"id_username\">Username:</label> \
         <input type=\"text\" name=\"username\" id=\"id_username\" value=\"{username}\"></p>\n\
         <p><label for=\"id_password\">Password:</label> \
         <input type=\"password\" name=\"password\" id=\"id_password\"></p>\n\
         <input type=\"hidden\" name=\"next\" value=\"{next}\">\n\
         <button type=\"submit\">Log in</button>\n</form>\n\
         <p><a href=\"/accounts/signup/\">Sign up</a></p>"
    );
    page("Log in", &nav(context), &body)
}

fn signup(context: &Value) -> String {
    let mut fields = String::new();
    fields.push_str(&input_field(context, "username", "Username", "text"));
    fields.push_str(&password_field(context, "password1", "Password"));
    fields.push_str(&password_field(context, "password2", "Password confirmation"));

    let body = format!(
        "<h1>Sign up</h1>\n\
         <form method=\"post\" action=\"/accounts/signup/submit/\">\n\
         {fields}<button type=\"submit\">Sign up</button>\n</form>\n\
         <p><a href=\"/accounts/login/\">Log in</a></p>"
    );
    page("Sign up", &nav(context), &body)
}

fn slot_list(context: &Value) -> String {
    let alert = text(context, "alert");
    let alert_html = if alert.is_empty() {
        String::new()
    } else {
        format!("<ul class=\"errorlist nonfield\"><li>{}</li></ul>\n", escape(alert))
    };

    let slots = items(context, "slots");
    let table = if slots.is_empty() {
        "<p>No time slots defined.</p>".to_string()
    } else {
        let mut rows = String::new();
        for slot in slots {
            let id = escape(text(slot, "id"));
            rows.push_str(&format!(
                "<tr><td>{label}</td><td>{window}</td>\
                 <td><form method=\"post\" action=\"/slots/{id}/delete/\">\
                 <button type=\"submit\">Delete</button></form></td></tr>\n",
                label = escape(text(slot, "label")),
                window = escape(text(slot, "window")),
            ));
        }
        format!(
            "<table>\n<thead><tr><th>Label</th><th>Window</th><th></th></tr></thead>\n\
             <tbody>\n{rows}</tbody>\n</table>"
        )
    };

    let mut fields = String::new();
    fields.push_str(&input_field(context, "label", "Label", "text"));
    fields.push_str(&input_field(context, "start_time", "Start time", "time"));
    fields.push_str(&input_field(context, "end_time", "End time", "time"));

    let body = format!(
        "<h1>Time slots</h1>\n{alert_html}{table}\n\
         <h2>Add slot</h2>\n\
         <form method=\"post\" action=\"/slots/create/\">\n\
         {fields}<button type=\"submit\">Add slot</button>\n</form>"
    );
    page("Time slots", &nav(context), &body)
}
