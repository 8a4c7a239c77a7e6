//! Builders for small backup documents.

pub const PROLOG: &str = "<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>";

pub fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn sms(address: &str, contact_name: &str, body: &str, date: i64) -> String {
    format!(
        r#"<sms protocol="0" address="{}" date="{}" type="1" subject="null" body="{}" toa="null" sc_toa="null" service_center="null" read="1" status="-1" locked="0" date_sent="0" readable_date="Nov 14, 2023" contact_name="{}" />"#,
        escape(address),
        date,
        escape(body),
        escape(contact_name)
    )
}

pub fn text_part(text: &str) -> String {
    format!(
        r#"<part seq="0" ct="text/plain" name="null" chset="106" cd="null" fn="null" cid="&lt;text&gt;" cl="text.txt" text="{}" />"#,
        escape(text)
    )
}

pub fn binary_part(content_type: &str, name: &str, data: &str) -> String {
    format!(
        r#"<part seq="0" ct="{}" name="{}" chset="null" cd="null" fn="null" cid="&lt;0&gt;" cl="{}" text="null" data="{}" />"#,
        escape(content_type),
        escape(name),
        escape(name),
        data
    )
}

pub fn smil_part() -> String {
    r#"<part seq="-1" ct="application/smil" name="null" chset="null" cd="null" fn="null" cid="&lt;smil&gt;" cl="smil.xml" text="&lt;smil&gt;&lt;body/&gt;&lt;/smil&gt;" />"#.to_string()
}

/// `addresses` are `(number, type code)` pairs.
pub fn mms(
    address: &str,
    contact_name: &str,
    date: i64,
    parts: &[String],
    addresses: &[(&str, u16)],
) -> String {
    let addrs: String = addresses
        .iter()
        .map(|(number, ty)| {
            format!(
                r#"<addr address="{}" type="{}" charset="106" />"#,
                escape(number),
                ty
            )
        })
        .collect();

    format!(
        r#"<mms date="{}" ct_t="application/vnd.wap.multipart.related" msg_box="1" rr="null" sub="null" read_status="null" seen="1" m_size="1024" m_cls="personal" text_only="0" read="1" locked="0" date_sent="0" address="{}" readable_date="Nov 14, 2023" contact_name="{}"><parts>{}</parts><addrs>{}</addrs></mms>"#,
        date,
        escape(address),
        escape(contact_name),
        parts.concat(),
        addrs
    )
}

pub fn call(number: &str, contact_name: &str, duration: &str, call_type: u8, date: i64) -> String {
    format!(
        r#"<call number="{}" duration="{}" date="{}" type="{}" presentation="1" readable_date="Nov 14, 2023" contact_name="{}" />"#,
        escape(number),
        duration,
        date,
        call_type,
        escape(contact_name)
    )
}

/// A `<smses>` document whose `count` matches the records.
pub fn messages(records: &[String]) -> String {
    messages_with_count(&records.len().to_string(), records)
}

pub fn messages_with_count(count: &str, records: &[String]) -> String {
    format!(
        "{}\n<smses count=\"{}\" backup_set=\"a1b2\" backup_date=\"1700000000000\">\n{}\n</smses>\n",
        PROLOG,
        count,
        records.join("\n")
    )
}

pub fn calls(records: &[String]) -> String {
    format!(
        "{}\n<calls count=\"{}\" backup_set=\"a1b2\" backup_date=\"1700000000000\">\n{}\n</calls>\n",
        PROLOG,
        records.len(),
        records.join("\n")
    )
}
