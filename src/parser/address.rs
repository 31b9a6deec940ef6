//! RFC 5322 addresses (§3.4) and message identifiers (§3.6.4), including
//! the obsolete route syntax.

use super::encoded_word::encoded_word_seq;
use super::engine::{first_of, parse_all, Cursor, Parse};
use super::lexical::{atom, cfws, domain_literal, quoted_string, word};
use crate::charset::{try_from_utf8, Transcoder};
use crate::model::Mailbox;

/// Parse an `address-list` header value such as `From` or `To`.
///
/// Raw octets in names and addresses are read as UTF-8 when they form valid
/// UTF-8.
pub fn parse_address_list(value: &[u8], tc: &dyn Transcoder) -> Option<Vec<Mailbox>> {
    let list = parse_all(value, |c| address_list(c, tc))?;
    Some(list.into_iter().map(reinterpret).collect())
}

fn reinterpret(mb: Mailbox) -> Mailbox {
    Mailbox {
        is_group: mb.is_group,
        name: mb.name.as_deref().map(try_from_utf8),
        addr: mb.addr.as_deref().map(try_from_utf8),
        list: mb.list.map(|l| l.into_iter().map(reinterpret).collect()),
    }
}

// ── Display names ───────────────────────────────────────────────────

pub fn phrase(c: &mut Cursor<'_>, tc: &dyn Transcoder) -> Parse<String> {
    c.optional(cfws);
    let mut ret = first_of!(c;
        |c| encoded_word_seq(c, tc),
        |c| word(c, true),
    )?;
    for chunk in c.zero_or_more(|c| {
        let mut s = c.optional(cfws).unwrap_or_default();
        let t = first_of!(c;
            |c| encoded_word_seq(c, tc),
            |c| word(c, true),
            |c| c.literal(b".").map(|_| ".".to_string()),
        )?;
        s.push_str(&t);
        Ok(s)
    }) {
        ret.push_str(&chunk);
    }
    c.optional(cfws);
    Ok(ret)
}

// ── Addresses (§3.4) ────────────────────────────────────────────────

pub fn address(c: &mut Cursor<'_>, tc: &dyn Transcoder) -> Parse<Mailbox> {
    first_of!(c;
        |c| mailbox(c, tc),
        |c| group(c, tc),
    )
}

pub fn mailbox(c: &mut Cursor<'_>, tc: &dyn Transcoder) -> Parse<Mailbox> {
    first_of!(c;
        |c| name_addr(c, tc),
        |c| addr_spec(c).map(|addr| Mailbox::new(None, addr)),
    )
}

pub fn name_addr(c: &mut Cursor<'_>, tc: &dyn Transcoder) -> Parse<Mailbox> {
    let name = c.optional(|c| phrase(c, tc));
    let addr = angle_addr(c)?;
    Ok(Mailbox::new(name, addr))
}

pub fn angle_addr(c: &mut Cursor<'_>) -> Parse<String> {
    c.optional(cfws);
    c.literal(b"<")?;
    c.optional(obs_route);
    let ret = addr_spec(c)?;
    c.literal(b">")?;
    c.optional(cfws);
    Ok(ret)
}

pub fn group(c: &mut Cursor<'_>, tc: &dyn Transcoder) -> Parse<Mailbox> {
    let name = phrase(c, tc)?;
    c.literal(b":")?;
    let list = c.optional(|c| group_list(c, tc));
    c.literal(b";")?;
    c.optional(cfws);
    Ok(Mailbox::group(name, list))
}

fn leading_commas(c: &mut Cursor<'_>) {
    c.zero_or_more(|c| {
        c.optional(cfws);
        c.literal(b",")
    });
}

pub fn mailbox_list(c: &mut Cursor<'_>, tc: &dyn Transcoder) -> Parse<Vec<Mailbox>> {
    leading_commas(c);
    let mut ret = vec![mailbox(c, tc)?];
    for more in c.zero_or_more(|c| {
        c.literal(b",")?;
        Ok(c
            .optional(|c| {
                first_of!(c;
                    |c| mailbox(c, tc).map(Some),
                    |c| cfws(c).map(|_| None),
                )
            })
            .flatten())
    }) {
        ret.extend(more);
    }
    Ok(ret)
}

pub fn address_list(c: &mut Cursor<'_>, tc: &dyn Transcoder) -> Parse<Vec<Mailbox>> {
    leading_commas(c);
    let mut ret = vec![address(c, tc)?];
    for more in c.zero_or_more(|c| {
        c.literal(b",")?;
        Ok(c
            .optional(|c| {
                first_of!(c;
                    |c| address(c, tc).map(Some),
                    |c| cfws(c).map(|_| None),
                )
            })
            .flatten())
    }) {
        ret.extend(more);
    }
    Ok(ret)
}

pub fn group_list(c: &mut Cursor<'_>, tc: &dyn Transcoder) -> Parse<Vec<Mailbox>> {
    first_of!(c;
        |c| mailbox_list(c, tc),
        |c| {
            c.one_or_more(|c| {
                c.optional(cfws);
                c.literal(b",")
            })?;
            c.optional(cfws);
            Ok(Vec::new())
        },
        |c| cfws(c).map(|_| Vec::new()),
    )
}

// ── Addr-spec (§3.4.1) ──────────────────────────────────────────────

pub fn addr_spec(c: &mut Cursor<'_>) -> Parse<String> {
    let mut ret = local_part(c)?;
    c.literal(b"@")?;
    ret.push('@');
    ret.push_str(&domain(c)?);
    Ok(ret)
}

pub fn local_part(c: &mut Cursor<'_>) -> Parse<String> {
    first_of!(c;
        |c| quoted_string(c, false),
        |c| dotted(c, |c| word(c, false)),
    )
}

pub fn domain(c: &mut Cursor<'_>) -> Parse<String> {
    first_of!(c;
        domain_literal,
        |c| dotted(c, |c| atom(c, false)),
    )
}

/// `item *("." item)`, joined with dots.
fn dotted<'a>(
    c: &mut Cursor<'a>,
    mut item: impl FnMut(&mut Cursor<'a>) -> Parse<String>,
) -> Parse<String> {
    let mut ret = item(c)?;
    for more in c.zero_or_more(|c| {
        c.literal(b".")?;
        item(c)
    }) {
        ret.push('.');
        ret.push_str(&more);
    }
    Ok(ret)
}

// ── Identifiers (§3.6.4) ────────────────────────────────────────────

/// `"<" id-left "@" id-right ">"`, returned without the angle brackets.
pub fn msg_id(c: &mut Cursor<'_>) -> Parse<String> {
    c.optional(cfws);
    c.literal(b"<")?;
    let mut ret = local_part(c)?;
    c.literal(b"@")?;
    ret.push('@');
    ret.push_str(&domain(c)?);
    c.literal(b">")?;
    c.optional(cfws);
    Ok(ret)
}

// ── Obsolete syntax (§4.4) ──────────────────────────────────────────

pub fn obs_route(c: &mut Cursor<'_>) -> Parse<()> {
    c.zero_or_more(|c| {
        first_of!(c;
            |c| cfws(c).map(|_| ()),
            |c| c.literal(b",").map(|_| ()),
        )
    });
    c.literal(b"@")?;
    domain(c)?;
    c.zero_or_more(|c| {
        c.literal(b",")?;
        c.optional(cfws);
        c.optional(|c| {
            c.literal(b"@")?;
            domain(c)
        });
        Ok(())
    });
    c.literal(b":")?;
    Ok(())
}
