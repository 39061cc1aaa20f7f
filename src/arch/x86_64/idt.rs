//! Interrupt Descriptor Table and vector dispatch (L1/L2).
//!
//! The specification's data model treats the 256 IDT vectors as a flat
//! array where each slot is either `Unregistered` or `Registered { .. }`
//! — never a raw nullable function pointer. [`register_handler`] and
//! [`unregister_handler`] mutate that parallel table; the IDT gates
//! themselves are installed once at boot and never touched again. Every
//! gate is a small `extern "x86-interrupt"` trampoline that looks the
//! vector up in the table and calls through.
//!
//! CPU exceptions (vectors 0-31) go through the same table as IRQs and
//! the syscall gate: an exception with no registered handler falls
//! through to the exception policy (disable interrupts, halt with a
//! console dump of the vector). IRQ trampolines (vectors 0x20-0x2F) send
//! End-of-Interrupt to the PIC *before* dispatching, matching the IRQ
//! policy; [`pic::end_of_interrupt`] already cascades to both
//! controllers for IRQ >= 8, so the trampoline just calls it
//! unconditionally for any vector at or above the master offset.

use lazy_static::lazy_static;
use spin::Mutex;
use x86_64::structures::idt::{InterruptDescriptorTable, InterruptStackFrame, PageFaultErrorCode};
use x86_64::VirtAddr;

use crate::arch::x86_64::tss::{DOUBLE_FAULT_IST_INDEX, MACHINE_CHECK_IST_INDEX, NMI_IST_INDEX};
use crate::arch::x86_64::{pic, port};
use crate::lib::console;

/// Total number of IDT vectors.
pub const VECTOR_COUNT: usize = 256;
/// The kernel's own syscall gate, per the custom ABI (not 0x80, not
/// `syscall`/`sysret`).
pub const SYSCALL_VECTOR: u8 = 0x4D;

/// A single slot of the vector -> handler table.
#[derive(Clone, Copy)]
enum VectorHandler {
    Unregistered,
    Registered(fn(u8)),
}

struct HandlerTable {
    slots: [VectorHandler; VECTOR_COUNT],
}

impl HandlerTable {
    const fn new() -> Self {
        Self {
            slots: [VectorHandler::Unregistered; VECTOR_COUNT],
        }
    }
}

static HANDLERS: Mutex<HandlerTable> = Mutex::new(HandlerTable::new());

/// Registers `handler` for `vector`, overwriting any prior
/// registration. Brackets the mutation with interrupts disabled, since
/// the table is read from interrupt context.
pub fn register_handler(vector: u8, handler: fn(u8)) {
    port::without_interrupts(|| {
        HANDLERS.lock().slots[vector as usize] = VectorHandler::Registered(handler);
    });
}

/// Clears `vector`'s registration. A subsequent interrupt on that
/// vector falls through to the exception/unregistered-IRQ policy.
pub fn unregister_handler(vector: u8) {
    port::without_interrupts(|| {
        HANDLERS.lock().slots[vector as usize] = VectorHandler::Unregistered;
    });
}

/// Whether `vector` currently has a registered handler.
pub fn is_registered(vector: u8) -> bool {
    matches!(
        HANDLERS.lock().slots[vector as usize],
        VectorHandler::Registered(_)
    )
}

/// Shared entry point every trampoline calls. IRQ vectors have already
/// had EOI sent by the caller.
fn dispatch(vector: u8) {
    let slot = HANDLERS.lock().slots[vector as usize];
    match slot {
        VectorHandler::Registered(handler) => handler(vector),
        VectorHandler::Unregistered => unhandled_vector(vector),
    }
}

/// Exception policy: disable interrupts and halt with a console dump.
/// Applies to any vector — exception or IRQ — raised with nothing
/// registered for it.
fn unhandled_vector(vector: u8) -> ! {
    port::disable_interrupts();
    console::console_write(b"\n[idt] unhandled vector 0x");
    console::console_write_hex(vector as u32);
    console::console_write(b" -- halting\n");
    loop {
        port::disable_interrupts();
        port::hlt();
    }
}

macro_rules! exception_handler {
    ($name:ident, $vector:expr) => {
        extern "x86-interrupt" fn $name(_frame: InterruptStackFrame) {
            dispatch($vector);
        }
    };
}

macro_rules! exception_handler_with_code {
    ($name:ident, $vector:expr) => {
        extern "x86-interrupt" fn $name(_frame: InterruptStackFrame, _error_code: u64) {
            dispatch($vector);
        }
    };
}

exception_handler!(divide_error_handler, 0);
exception_handler!(debug_handler, 1);
exception_handler!(non_maskable_interrupt_handler, 2);
exception_handler!(breakpoint_handler, 3);
exception_handler!(overflow_handler, 4);
exception_handler!(bound_range_exceeded_handler, 5);
exception_handler!(invalid_opcode_handler, 6);
exception_handler!(device_not_available_handler, 7);
exception_handler_with_code!(invalid_tss_handler, 10);
exception_handler_with_code!(segment_not_present_handler, 11);
exception_handler_with_code!(stack_segment_fault_handler, 12);
exception_handler_with_code!(general_protection_fault_handler, 13);
exception_handler!(x87_floating_point_handler, 16);
exception_handler_with_code!(alignment_check_handler, 17);
exception_handler!(simd_floating_point_handler, 19);
exception_handler!(virtualization_handler, 20);
exception_handler_with_code!(security_exception_handler, 30);

extern "x86-interrupt" fn double_fault_handler(_frame: InterruptStackFrame, _error_code: u64) -> ! {
    dispatch(8);
    unhandled_vector(8)
}

extern "x86-interrupt" fn machine_check_handler(_frame: InterruptStackFrame) -> ! {
    dispatch(18);
    unhandled_vector(18)
}

extern "x86-interrupt" fn page_fault_handler(
    _frame: InterruptStackFrame,
    _error_code: PageFaultErrorCode,
) {
    dispatch(14);
}

extern "x86-interrupt" fn vector_20(_frame: InterruptStackFrame) {
    dispatch(32);
}

extern "x86-interrupt" fn vector_21(_frame: InterruptStackFrame) {
    dispatch(33);
}

extern "x86-interrupt" fn vector_22(_frame: InterruptStackFrame) {
    dispatch(34);
}

extern "x86-interrupt" fn vector_23(_frame: InterruptStackFrame) {
    dispatch(35);
}

extern "x86-interrupt" fn vector_24(_frame: InterruptStackFrame) {
    dispatch(36);
}

extern "x86-interrupt" fn vector_25(_frame: InterruptStackFrame) {
    dispatch(37);
}

extern "x86-interrupt" fn vector_26(_frame: InterruptStackFrame) {
    dispatch(38);
}

extern "x86-interrupt" fn vector_27(_frame: InterruptStackFrame) {
    dispatch(39);
}

extern "x86-interrupt" fn vector_28(_frame: InterruptStackFrame) {
    dispatch(40);
}

extern "x86-interrupt" fn vector_29(_frame: InterruptStackFrame) {
    dispatch(41);
}

extern "x86-interrupt" fn vector_2a(_frame: InterruptStackFrame) {
    dispatch(42);
}

extern "x86-interrupt" fn vector_2b(_frame: InterruptStackFrame) {
    dispatch(43);
}

extern "x86-interrupt" fn vector_2c(_frame: InterruptStackFrame) {
    dispatch(44);
}

extern "x86-interrupt" fn vector_2d(_frame: InterruptStackFrame) {
    dispatch(45);
}

extern "x86-interrupt" fn vector_2e(_frame: InterruptStackFrame) {
    dispatch(46);
}

extern "x86-interrupt" fn vector_2f(_frame: InterruptStackFrame) {
    dispatch(47);
}

extern "x86-interrupt" fn vector_30(_frame: InterruptStackFrame) {
    dispatch(48);
}

extern "x86-interrupt" fn vector_31(_frame: InterruptStackFrame) {
    dispatch(49);
}

extern "x86-interrupt" fn vector_32(_frame: InterruptStackFrame) {
    dispatch(50);
}

extern "x86-interrupt" fn vector_33(_frame: InterruptStackFrame) {
    dispatch(51);
}

extern "x86-interrupt" fn vector_34(_frame: InterruptStackFrame) {
    dispatch(52);
}

extern "x86-interrupt" fn vector_35(_frame: InterruptStackFrame) {
    dispatch(53);
}

extern "x86-interrupt" fn vector_36(_frame: InterruptStackFrame) {
    dispatch(54);
}

extern "x86-interrupt" fn vector_37(_frame: InterruptStackFrame) {
    dispatch(55);
}

extern "x86-interrupt" fn vector_38(_frame: InterruptStackFrame) {
    dispatch(56);
}

extern "x86-interrupt" fn vector_39(_frame: InterruptStackFrame) {
    dispatch(57);
}

extern "x86-interrupt" fn vector_3a(_frame: InterruptStackFrame) {
    dispatch(58);
}

extern "x86-interrupt" fn vector_3b(_frame: InterruptStackFrame) {
    dispatch(59);
}

extern "x86-interrupt" fn vector_3c(_frame: InterruptStackFrame) {
    dispatch(60);
}

extern "x86-interrupt" fn vector_3d(_frame: InterruptStackFrame) {
    dispatch(61);
}

extern "x86-interrupt" fn vector_3e(_frame: InterruptStackFrame) {
    dispatch(62);
}

extern "x86-interrupt" fn vector_3f(_frame: InterruptStackFrame) {
    dispatch(63);
}

extern "x86-interrupt" fn vector_40(_frame: InterruptStackFrame) {
    dispatch(64);
}

extern "x86-interrupt" fn vector_41(_frame: InterruptStackFrame) {
    dispatch(65);
}

extern "x86-interrupt" fn vector_42(_frame: InterruptStackFrame) {
    dispatch(66);
}

extern "x86-interrupt" fn vector_43(_frame: InterruptStackFrame) {
    dispatch(67);
}

extern "x86-interrupt" fn vector_44(_frame: InterruptStackFrame) {
    dispatch(68);
}

extern "x86-interrupt" fn vector_45(_frame: InterruptStackFrame) {
    dispatch(69);
}

extern "x86-interrupt" fn vector_46(_frame: InterruptStackFrame) {
    dispatch(70);
}

extern "x86-interrupt" fn vector_47(_frame: InterruptStackFrame) {
    dispatch(71);
}

extern "x86-interrupt" fn vector_48(_frame: InterruptStackFrame) {
    dispatch(72);
}

extern "x86-interrupt" fn vector_49(_frame: InterruptStackFrame) {
    dispatch(73);
}

extern "x86-interrupt" fn vector_4a(_frame: InterruptStackFrame) {
    dispatch(74);
}

extern "x86-interrupt" fn vector_4b(_frame: InterruptStackFrame) {
    dispatch(75);
}

extern "x86-interrupt" fn vector_4c(_frame: InterruptStackFrame) {
    dispatch(76);
}

extern "x86-interrupt" fn vector_4d(_frame: InterruptStackFrame) {
    dispatch(77);
}

extern "x86-interrupt" fn vector_4e(_frame: InterruptStackFrame) {
    dispatch(78);
}

extern "x86-interrupt" fn vector_4f(_frame: InterruptStackFrame) {
    dispatch(79);
}

extern "x86-interrupt" fn vector_50(_frame: InterruptStackFrame) {
    dispatch(80);
}

extern "x86-interrupt" fn vector_51(_frame: InterruptStackFrame) {
    dispatch(81);
}

extern "x86-interrupt" fn vector_52(_frame: InterruptStackFrame) {
    dispatch(82);
}

extern "x86-interrupt" fn vector_53(_frame: InterruptStackFrame) {
    dispatch(83);
}

extern "x86-interrupt" fn vector_54(_frame: InterruptStackFrame) {
    dispatch(84);
}

extern "x86-interrupt" fn vector_55(_frame: InterruptStackFrame) {
    dispatch(85);
}

extern "x86-interrupt" fn vector_56(_frame: InterruptStackFrame) {
    dispatch(86);
}

extern "x86-interrupt" fn vector_57(_frame: InterruptStackFrame) {
    dispatch(87);
}

extern "x86-interrupt" fn vector_58(_frame: InterruptStackFrame) {
    dispatch(88);
}

extern "x86-interrupt" fn vector_59(_frame: InterruptStackFrame) {
    dispatch(89);
}

extern "x86-interrupt" fn vector_5a(_frame: InterruptStackFrame) {
    dispatch(90);
}

extern "x86-interrupt" fn vector_5b(_frame: InterruptStackFrame) {
    dispatch(91);
}

extern "x86-interrupt" fn vector_5c(_frame: InterruptStackFrame) {
    dispatch(92);
}

extern "x86-interrupt" fn vector_5d(_frame: InterruptStackFrame) {
    dispatch(93);
}

extern "x86-interrupt" fn vector_5e(_frame: InterruptStackFrame) {
    dispatch(94);
}

extern "x86-interrupt" fn vector_5f(_frame: InterruptStackFrame) {
    dispatch(95);
}

extern "x86-interrupt" fn vector_60(_frame: InterruptStackFrame) {
    dispatch(96);
}

extern "x86-interrupt" fn vector_61(_frame: InterruptStackFrame) {
    dispatch(97);
}

extern "x86-interrupt" fn vector_62(_frame: InterruptStackFrame) {
    dispatch(98);
}

extern "x86-interrupt" fn vector_63(_frame: InterruptStackFrame) {
    dispatch(99);
}

extern "x86-interrupt" fn vector_64(_frame: InterruptStackFrame) {
    dispatch(100);
}

extern "x86-interrupt" fn vector_65(_frame: InterruptStackFrame) {
    dispatch(101);
}

extern "x86-interrupt" fn vector_66(_frame: InterruptStackFrame) {
    dispatch(102);
}

extern "x86-interrupt" fn vector_67(_frame: InterruptStackFrame) {
    dispatch(103);
}

extern "x86-interrupt" fn vector_68(_frame: InterruptStackFrame) {
    dispatch(104);
}

extern "x86-interrupt" fn vector_69(_frame: InterruptStackFrame) {
    dispatch(105);
}

extern "x86-interrupt" fn vector_6a(_frame: InterruptStackFrame) {
    dispatch(106);
}

extern "x86-interrupt" fn vector_6b(_frame: InterruptStackFrame) {
    dispatch(107);
}

extern "x86-interrupt" fn vector_6c(_frame: InterruptStackFrame) {
    dispatch(108);
}

extern "x86-interrupt" fn vector_6d(_frame: InterruptStackFrame) {
    dispatch(109);
}

extern "x86-interrupt" fn vector_6e(_frame: InterruptStackFrame) {
    dispatch(110);
}

extern "x86-interrupt" fn vector_6f(_frame: InterruptStackFrame) {
    dispatch(111);
}

extern "x86-interrupt" fn vector_70(_frame: InterruptStackFrame) {
    dispatch(112);
}

extern "x86-interrupt" fn vector_71(_frame: InterruptStackFrame) {
    dispatch(113);
}

extern "x86-interrupt" fn vector_72(_frame: InterruptStackFrame) {
    dispatch(114);
}

extern "x86-interrupt" fn vector_73(_frame: InterruptStackFrame) {
    dispatch(115);
}

extern "x86-interrupt" fn vector_74(_frame: InterruptStackFrame) {
    dispatch(116);
}

extern "x86-interrupt" fn vector_75(_frame: InterruptStackFrame) {
    dispatch(117);
}

extern "x86-interrupt" fn vector_76(_frame: InterruptStackFrame) {
    dispatch(118);
}

extern "x86-interrupt" fn vector_77(_frame: InterruptStackFrame) {
    dispatch(119);
}

extern "x86-interrupt" fn vector_78(_frame: InterruptStackFrame) {
    dispatch(120);
}

extern "x86-interrupt" fn vector_79(_frame: InterruptStackFrame) {
    dispatch(121);
}

extern "x86-interrupt" fn vector_7a(_frame: InterruptStackFrame) {
    dispatch(122);
}

extern "x86-interrupt" fn vector_7b(_frame: InterruptStackFrame) {
    dispatch(123);
}

extern "x86-interrupt" fn vector_7c(_frame: InterruptStackFrame) {
    dispatch(124);
}

extern "x86-interrupt" fn vector_7d(_frame: InterruptStackFrame) {
    dispatch(125);
}

extern "x86-interrupt" fn vector_7e(_frame: InterruptStackFrame) {
    dispatch(126);
}

extern "x86-interrupt" fn vector_7f(_frame: InterruptStackFrame) {
    dispatch(127);
}

extern "x86-interrupt" fn vector_80(_frame: InterruptStackFrame) {
    dispatch(128);
}

extern "x86-interrupt" fn vector_81(_frame: InterruptStackFrame) {
    dispatch(129);
}

extern "x86-interrupt" fn vector_82(_frame: InterruptStackFrame) {
    dispatch(130);
}

extern "x86-interrupt" fn vector_83(_frame: InterruptStackFrame) {
    dispatch(131);
}

extern "x86-interrupt" fn vector_84(_frame: InterruptStackFrame) {
    dispatch(132);
}

extern "x86-interrupt" fn vector_85(_frame: InterruptStackFrame) {
    dispatch(133);
}

extern "x86-interrupt" fn vector_86(_frame: InterruptStackFrame) {
    dispatch(134);
}

extern "x86-interrupt" fn vector_87(_frame: InterruptStackFrame) {
    dispatch(135);
}

extern "x86-interrupt" fn vector_88(_frame: InterruptStackFrame) {
    dispatch(136);
}

extern "x86-interrupt" fn vector_89(_frame: InterruptStackFrame) {
    dispatch(137);
}

extern "x86-interrupt" fn vector_8a(_frame: InterruptStackFrame) {
    dispatch(138);
}

extern "x86-interrupt" fn vector_8b(_frame: InterruptStackFrame) {
    dispatch(139);
}

extern "x86-interrupt" fn vector_8c(_frame: InterruptStackFrame) {
    dispatch(140);
}

extern "x86-interrupt" fn vector_8d(_frame: InterruptStackFrame) {
    dispatch(141);
}

extern "x86-interrupt" fn vector_8e(_frame: InterruptStackFrame) {
    dispatch(142);
}

extern "x86-interrupt" fn vector_8f(_frame: InterruptStackFrame) {
    dispatch(143);
}

extern "x86-interrupt" fn vector_90(_frame: InterruptStackFrame) {
    dispatch(144);
}

extern "x86-interrupt" fn vector_91(_frame: InterruptStackFrame) {
    dispatch(145);
}

extern "x86-interrupt" fn vector_92(_frame: InterruptStackFrame) {
    dispatch(146);
}

extern "x86-interrupt" fn vector_93(_frame: InterruptStackFrame) {
    dispatch(147);
}

extern "x86-interrupt" fn vector_94(_frame: InterruptStackFrame) {
    dispatch(148);
}

extern "x86-interrupt" fn vector_95(_frame: InterruptStackFrame) {
    dispatch(149);
}

extern "x86-interrupt" fn vector_96(_frame: InterruptStackFrame) {
    dispatch(150);
}

extern "x86-interrupt" fn vector_97(_frame: InterruptStackFrame) {
    dispatch(151);
}

extern "x86-interrupt" fn vector_98(_frame: InterruptStackFrame) {
    dispatch(152);
}

extern "x86-interrupt" fn vector_99(_frame: InterruptStackFrame) {
    dispatch(153);
}

extern "x86-interrupt" fn vector_9a(_frame: InterruptStackFrame) {
    dispatch(154);
}

extern "x86-interrupt" fn vector_9b(_frame: InterruptStackFrame) {
    dispatch(155);
}

extern "x86-interrupt" fn vector_9c(_frame: InterruptStackFrame) {
    dispatch(156);
}

extern "x86-interrupt" fn vector_9d(_frame: InterruptStackFrame) {
    dispatch(157);
}

extern "x86-interrupt" fn vector_9e(_frame: InterruptStackFrame) {
    dispatch(158);
}

extern "x86-interrupt" fn vector_9f(_frame: InterruptStackFrame) {
    dispatch(159);
}

extern "x86-interrupt" fn vector_a0(_frame: InterruptStackFrame) {
    dispatch(160);
}

extern "x86-interrupt" fn vector_a1(_frame: InterruptStackFrame) {
    dispatch(161);
}

extern "x86-interrupt" fn vector_a2(_frame: InterruptStackFrame) {
    dispatch(162);
}

extern "x86-interrupt" fn vector_a3(_frame: InterruptStackFrame) {
    dispatch(163);
}

extern "x86-interrupt" fn vector_a4(_frame: InterruptStackFrame) {
    dispatch(164);
}

extern "x86-interrupt" fn vector_a5(_frame: InterruptStackFrame) {
    dispatch(165);
}

extern "x86-interrupt" fn vector_a6(_frame: InterruptStackFrame) {
    dispatch(166);
}

extern "x86-interrupt" fn vector_a7(_frame: InterruptStackFrame) {
    dispatch(167);
}

extern "x86-interrupt" fn vector_a8(_frame: InterruptStackFrame) {
    dispatch(168);
}

extern "x86-interrupt" fn vector_a9(_frame: InterruptStackFrame) {
    dispatch(169);
}

extern "x86-interrupt" fn vector_aa(_frame: InterruptStackFrame) {
    dispatch(170);
}

extern "x86-interrupt" fn vector_ab(_frame: InterruptStackFrame) {
    dispatch(171);
}

extern "x86-interrupt" fn vector_ac(_frame: InterruptStackFrame) {
    dispatch(172);
}

extern "x86-interrupt" fn vector_ad(_frame: InterruptStackFrame) {
    dispatch(173);
}

extern "x86-interrupt" fn vector_ae(_frame: InterruptStackFrame) {
    dispatch(174);
}

extern "x86-interrupt" fn vector_af(_frame: InterruptStackFrame) {
    dispatch(175);
}

extern "x86-interrupt" fn vector_b0(_frame: InterruptStackFrame) {
    dispatch(176);
}

extern "x86-interrupt" fn vector_b1(_frame: InterruptStackFrame) {
    dispatch(177);
}

extern "x86-interrupt" fn vector_b2(_frame: InterruptStackFrame) {
    dispatch(178);
}

extern "x86-interrupt" fn vector_b3(_frame: InterruptStackFrame) {
    dispatch(179);
}

extern "x86-interrupt" fn vector_b4(_frame: InterruptStackFrame) {
    dispatch(180);
}

extern "x86-interrupt" fn vector_b5(_frame: InterruptStackFrame) {
    dispatch(181);
}

extern "x86-interrupt" fn vector_b6(_frame: InterruptStackFrame) {
    dispatch(182);
}

extern "x86-interrupt" fn vector_b7(_frame: InterruptStackFrame) {
    dispatch(183);
}

extern "x86-interrupt" fn vector_b8(_frame: InterruptStackFrame) {
    dispatch(184);
}

extern "x86-interrupt" fn vector_b9(_frame: InterruptStackFrame) {
    dispatch(185);
}

extern "x86-interrupt" fn vector_ba(_frame: InterruptStackFrame) {
    dispatch(186);
}

extern "x86-interrupt" fn vector_bb(_frame: InterruptStackFrame) {
    dispatch(187);
}

extern "x86-interrupt" fn vector_bc(_frame: InterruptStackFrame) {
    dispatch(188);
}

extern "x86-interrupt" fn vector_bd(_frame: InterruptStackFrame) {
    dispatch(189);
}

extern "x86-interrupt" fn vector_be(_frame: InterruptStackFrame) {
    dispatch(190);
}

extern "x86-interrupt" fn vector_bf(_frame: InterruptStackFrame) {
    dispatch(191);
}

extern "x86-interrupt" fn vector_c0(_frame: InterruptStackFrame) {
    dispatch(192);
}

extern "x86-interrupt" fn vector_c1(_frame: InterruptStackFrame) {
    dispatch(193);
}

extern "x86-interrupt" fn vector_c2(_frame: InterruptStackFrame) {
    dispatch(194);
}

extern "x86-interrupt" fn vector_c3(_frame: InterruptStackFrame) {
    dispatch(195);
}

extern "x86-interrupt" fn vector_c4(_frame: InterruptStackFrame) {
    dispatch(196);
}

extern "x86-interrupt" fn vector_c5(_frame: InterruptStackFrame) {
    dispatch(197);
}

extern "x86-interrupt" fn vector_c6(_frame: InterruptStackFrame) {
    dispatch(198);
}

extern "x86-interrupt" fn vector_c7(_frame: InterruptStackFrame) {
    dispatch(199);
}

extern "x86-interrupt" fn vector_c8(_frame: InterruptStackFrame) {
    dispatch(200);
}

extern "x86-interrupt" fn vector_c9(_frame: InterruptStackFrame) {
    dispatch(201);
}

extern "x86-interrupt" fn vector_ca(_frame: InterruptStackFrame) {
    dispatch(202);
}

extern "x86-interrupt" fn vector_cb(_frame: InterruptStackFrame) {
    dispatch(203);
}

extern "x86-interrupt" fn vector_cc(_frame: InterruptStackFrame) {
    dispatch(204);
}

extern "x86-interrupt" fn vector_cd(_frame: InterruptStackFrame) {
    dispatch(205);
}

extern "x86-interrupt" fn vector_ce(_frame: InterruptStackFrame) {
    dispatch(206);
}

extern "x86-interrupt" fn vector_cf(_frame: InterruptStackFrame) {
    dispatch(207);
}

extern "x86-interrupt" fn vector_d0(_frame: InterruptStackFrame) {
    dispatch(208);
}

extern "x86-interrupt" fn vector_d1(_frame: InterruptStackFrame) {
    dispatch(209);
}

extern "x86-interrupt" fn vector_d2(_frame: InterruptStackFrame) {
    dispatch(210);
}

extern "x86-interrupt" fn vector_d3(_frame: InterruptStackFrame) {
    dispatch(211);
}

extern "x86-interrupt" fn vector_d4(_frame: InterruptStackFrame) {
    dispatch(212);
}

extern "x86-interrupt" fn vector_d5(_frame: InterruptStackFrame) {
    dispatch(213);
}

extern "x86-interrupt" fn vector_d6(_frame: InterruptStackFrame) {
    dispatch(214);
}

extern "x86-interrupt" fn vector_d7(_frame: InterruptStackFrame) {
    dispatch(215);
}

extern "x86-interrupt" fn vector_d8(_frame: InterruptStackFrame) {
    dispatch(216);
}

extern "x86-interrupt" fn vector_d9(_frame: InterruptStackFrame) {
    dispatch(217);
}

extern "x86-interrupt" fn vector_da(_frame: InterruptStackFrame) {
    dispatch(218);
}

extern "x86-interrupt" fn vector_db(_frame: InterruptStackFrame) {
    dispatch(219);
}

extern "x86-interrupt" fn vector_dc(_frame: InterruptStackFrame) {
    dispatch(220);
}

extern "x86-interrupt" fn vector_dd(_frame: InterruptStackFrame) {
    dispatch(221);
}

extern "x86-interrupt" fn vector_de(_frame: InterruptStackFrame) {
    dispatch(222);
}

extern "x86-interrupt" fn vector_df(_frame: InterruptStackFrame) {
    dispatch(223);
}

extern "x86-interrupt" fn vector_e0(_frame: InterruptStackFrame) {
    dispatch(224);
}

extern "x86-interrupt" fn vector_e1(_frame: InterruptStackFrame) {
    dispatch(225);
}

extern "x86-interrupt" fn vector_e2(_frame: InterruptStackFrame) {
    dispatch(226);
}

extern "x86-interrupt" fn vector_e3(_frame: InterruptStackFrame) {
    dispatch(227);
}

extern "x86-interrupt" fn vector_e4(_frame: InterruptStackFrame) {
    dispatch(228);
}

extern "x86-interrupt" fn vector_e5(_frame: InterruptStackFrame) {
    dispatch(229);
}

extern "x86-interrupt" fn vector_e6(_frame: InterruptStackFrame) {
    dispatch(230);
}

extern "x86-interrupt" fn vector_e7(_frame: InterruptStackFrame) {
    dispatch(231);
}

extern "x86-interrupt" fn vector_e8(_frame: InterruptStackFrame) {
    dispatch(232);
}

extern "x86-interrupt" fn vector_e9(_frame: InterruptStackFrame) {
    dispatch(233);
}

extern "x86-interrupt" fn vector_ea(_frame: InterruptStackFrame) {
    dispatch(234);
}

extern "x86-interrupt" fn vector_eb(_frame: InterruptStackFrame) {
    dispatch(235);
}

extern "x86-interrupt" fn vector_ec(_frame: InterruptStackFrame) {
    dispatch(236);
}

extern "x86-interrupt" fn vector_ed(_frame: InterruptStackFrame) {
    dispatch(237);
}

extern "x86-interrupt" fn vector_ee(_frame: InterruptStackFrame) {
    dispatch(238);
}

extern "x86-interrupt" fn vector_ef(_frame: InterruptStackFrame) {
    dispatch(239);
}

extern "x86-interrupt" fn vector_f0(_frame: InterruptStackFrame) {
    dispatch(240);
}

extern "x86-interrupt" fn vector_f1(_frame: InterruptStackFrame) {
    dispatch(241);
}

extern "x86-interrupt" fn vector_f2(_frame: InterruptStackFrame) {
    dispatch(242);
}

extern "x86-interrupt" fn vector_f3(_frame: InterruptStackFrame) {
    dispatch(243);
}

extern "x86-interrupt" fn vector_f4(_frame: InterruptStackFrame) {
    dispatch(244);
}

extern "x86-interrupt" fn vector_f5(_frame: InterruptStackFrame) {
    dispatch(245);
}

extern "x86-interrupt" fn vector_f6(_frame: InterruptStackFrame) {
    dispatch(246);
}

extern "x86-interrupt" fn vector_f7(_frame: InterruptStackFrame) {
    dispatch(247);
}

extern "x86-interrupt" fn vector_f8(_frame: InterruptStackFrame) {
    dispatch(248);
}

extern "x86-interrupt" fn vector_f9(_frame: InterruptStackFrame) {
    dispatch(249);
}

extern "x86-interrupt" fn vector_fa(_frame: InterruptStackFrame) {
    dispatch(250);
}

extern "x86-interrupt" fn vector_fb(_frame: InterruptStackFrame) {
    dispatch(251);
}

extern "x86-interrupt" fn vector_fc(_frame: InterruptStackFrame) {
    dispatch(252);
}

extern "x86-interrupt" fn vector_fd(_frame: InterruptStackFrame) {
    dispatch(253);
}

extern "x86-interrupt" fn vector_fe(_frame: InterruptStackFrame) {
    dispatch(254);
}

extern "x86-interrupt" fn vector_ff(_frame: InterruptStackFrame) {
    dispatch(255);
}

pub(super) const IRQ_TRAMPOLINES: [extern "x86-interrupt" fn(InterruptStackFrame); 224] = [
    vector_20, vector_21, vector_22, vector_23, vector_24, vector_25, vector_26, vector_27, vector_28, vector_29, vector_2a, vector_2b, vector_2c, vector_2d, vector_2e, vector_2f, vector_30, vector_31, vector_32, vector_33, vector_34, vector_35, vector_36, vector_37, vector_38, vector_39, vector_3a, vector_3b, vector_3c, vector_3d, vector_3e, vector_3f, vector_40, vector_41, vector_42, vector_43, vector_44, vector_45, vector_46, vector_47, vector_48, vector_49, vector_4a, vector_4b, vector_4c, vector_4d, vector_4e, vector_4f, vector_50, vector_51, vector_52, vector_53, vector_54, vector_55, vector_56, vector_57, vector_58, vector_59, vector_5a, vector_5b, vector_5c, vector_5d, vector_5e, vector_5f, vector_60, vector_61, vector_62, vector_63, vector_64, vector_65, vector_66, vector_67, vector_68, vector_69, vector_6a, vector_6b, vector_6c, vector_6d, vector_6e, vector_6f, vector_70, vector_71, vector_72, vector_73, vector_74, vector_75, vector_76, vector_77, vector_78, vector_79, vector_7a, vector_7b, vector_7c, vector_7d, vector_7e, vector_7f, vector_80, vector_81, vector_82, vector_83, vector_84, vector_85, vector_86, vector_87, vector_88, vector_89, vector_8a, vector_8b, vector_8c, vector_8d, vector_8e, vector_8f, vector_90, vector_91, vector_92, vector_93, vector_94, vector_95, vector_96, vector_97, vector_98, vector_99, vector_9a, vector_9b, vector_9c, vector_9d, vector_9e, vector_9f, vector_a0, vector_a1, vector_a2, vector_a3, vector_a4, vector_a5, vector_a6, vector_a7, vector_a8, vector_a9, vector_aa, vector_ab, vector_ac, vector_ad, vector_ae, vector_af, vector_b0, vector_b1, vector_b2, vector_b3, vector_b4, vector_b5, vector_b6, vector_b7, vector_b8, vector_b9, vector_ba, vector_bb, vector_bc, vector_bd, vector_be, vector_bf, vector_c0, vector_c1, vector_c2, vector_c3, vector_c4, vector_c5, vector_c6, vector_c7, vector_c8, vector_c9, vector_ca, vector_cb, vector_cc, vector_cd, vector_ce, vector_cf, vector_d0, vector_d1, vector_d2, vector_d3, vector_d4, vector_d5, vector_d6, vector_d7, vector_d8, vector_d9, vector_da, vector_db, vector_dc, vector_dd, vector_de, vector_df, vector_e0, vector_e1, vector_e2, vector_e3, vector_e4, vector_e5, vector_e6, vector_e7, vector_e8, vector_e9, vector_ea, vector_eb, vector_ec, vector_ed, vector_ee, vector_ef, vector_f0, vector_f1, vector_f2, vector_f3, vector_f4, vector_f5, vector_f6, vector_f7, vector_f8, vector_f9, vector_fa, vector_fb, vector_fc, vector_fd, vector_fe, vector_ff
];

lazy_static! {
    static ref IDT: InterruptDescriptorTable = {
        let mut idt = InterruptDescriptorTable::new();

        idt.divide_error.set_handler_fn(divide_error_handler);
        idt.debug.set_handler_fn(debug_handler);
        idt.breakpoint.set_handler_fn(breakpoint_handler);
        idt.overflow.set_handler_fn(overflow_handler);
        idt.bound_range_exceeded
            .set_handler_fn(bound_range_exceeded_handler);
        idt.invalid_opcode.set_handler_fn(invalid_opcode_handler);
        idt.device_not_available
            .set_handler_fn(device_not_available_handler);
        idt.invalid_tss.set_handler_fn(invalid_tss_handler);
        idt.segment_not_present
            .set_handler_fn(segment_not_present_handler);
        idt.stack_segment_fault
            .set_handler_fn(stack_segment_fault_handler);
        idt.general_protection_fault
            .set_handler_fn(general_protection_fault_handler);
        idt.page_fault.set_handler_fn(page_fault_handler);
        idt.x87_floating_point
            .set_handler_fn(x87_floating_point_handler);
        idt.alignment_check.set_handler_fn(alignment_check_handler);
        idt.simd_floating_point
            .set_handler_fn(simd_floating_point_handler);
        idt.virtualization.set_handler_fn(virtualization_handler);
        idt.security_exception
            .set_handler_fn(security_exception_handler);

        unsafe {
            idt.double_fault
                .set_handler_fn(double_fault_handler)
                .set_stack_index(DOUBLE_FAULT_IST_INDEX);
            idt.machine_check
                .set_handler_fn(machine_check_handler)
                .set_stack_index(MACHINE_CHECK_IST_INDEX);
            idt.non_maskable_interrupt
                .set_handler_fn(non_maskable_interrupt_handler)
                .set_stack_index(NMI_IST_INDEX);
        }

        for (offset, trampoline) in IRQ_TRAMPOLINES.iter().enumerate() {
            idt[32 + offset].set_handler_fn(*trampoline);
        }

        idt
    };
}

/// Loads the IDT. Idempotent; a second call just reloads IDTR with the
/// same static table.
///
/// # Safety
/// Must run after the GDT/TSS are installed, since the double fault,
/// NMI, and machine check gates reference IST stacks set up there.
pub unsafe fn init() {
    IDT.load();
}

/// Points `vector`'s gate directly at `handler_addr`, bypassing the
/// generic vector -> handler table. The syscall ABI is the one caller:
/// its argument layout lives in general-purpose registers that the
/// generic `fn(u8)` handler signature has no way to carry, so it
/// installs its own naked entry stub here instead of registering
/// through [`register_handler`].
///
/// The IDT's memory is already live in IDTR once [`init`] has run, so
/// this mutates the table in place rather than reloading it.
///
/// # Safety
/// `handler_addr` must be the address of a handler that preserves the
/// full interrupt calling convention (it must end in `iretq` and
/// restore every register it disturbed).
pub unsafe fn install_raw_gate(vector: u8, handler_addr: u64) {
    port::without_interrupts(|| unsafe {
        let idt_ptr = &raw const *IDT as *mut InterruptDescriptorTable;
        (&mut (*idt_ptr))[vector as usize].set_handler_addr(x86_64::VirtAddr::new(handler_addr));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_table_round_trips() {
        fn probe(_vector: u8) {}
        assert!(!is_registered(0x60));
        register_handler(0x60, probe);
        assert!(is_registered(0x60));
        unregister_handler(0x60);
        assert!(!is_registered(0x60));
    }

    #[test]
    fn registering_overwrites_prior_handler() {
        fn first(_vector: u8) {}
        fn second(_vector: u8) {}
        register_handler(0x61, first);
        register_handler(0x61, second);
        let slot = HANDLERS.lock().slots[0x61];
        match slot {
            VectorHandler::Registered(f) => assert_eq!(f as usize, second as usize),
            VectorHandler::Unregistered => panic!("expected a registered handler"),
        }
        unregister_handler(0x61);
    }

    #[test]
    fn irq_trampoline_table_spans_32_to_255() {
        assert_eq!(IRQ_TRAMPOLINES.len(), 224);
    }
}
